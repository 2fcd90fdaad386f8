//! # kate-db-sqlite Implementation
//!
//! Maps the document-store ports onto SQLite. A category "document" is a
//! row in `categories` plus its rows in `insults`; a user document is a row
//! in `users`.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use kate_core::models::{Category, UserTally};
use kate_core::traits::{InsultRepo, UserRepo};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS categories (
        name       TEXT PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS insults (
        category TEXT NOT NULL REFERENCES categories(name),
        text     TEXT NOT NULL,
        added_at TEXT NOT NULL,
        PRIMARY KEY (category, text)
    )",
    "CREATE TABLE IF NOT EXISTS users (
        username    TEXT PRIMARY KEY NOT NULL,
        submissions INTEGER NOT NULL DEFAULT 0
    )",
];

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects and creates the schema. `sqlite::memory:` gives a private
    /// database held by a single pooled connection.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| "invalid sqlite url")?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&pool)
                .await
                .context("creating schema")?;
        }
        info!("sqlite store ready");

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl InsultRepo for SqliteStore {
    async fn get_category(&self, key: &str) -> anyhow::Result<Option<Category>> {
        let exists = sqlx::query("SELECT 1 FROM categories WHERE name = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let insults = sqlx::query("SELECT text FROM insults WHERE category = ? ORDER BY rowid ASC")
            .bind(key)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.get("text"))
            .collect();

        Ok(Some(Category {
            key: key.to_string(),
            insults,
        }))
    }

    async fn list_category_keys(&self) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.get("name")).collect())
    }

    async fn create_category(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT OR IGNORE INTO categories (name, created_at) VALUES (?, ?)")
            .bind(key)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Existence check and insert share one transaction, so an insult never
    /// lands in a category that is not there.
    async fn append_insult(&self, key: &str, insult: &str) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM categories WHERE name = ?")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            anyhow::bail!("category {key} does not exist");
        }

        sqlx::query("INSERT OR IGNORE INTO insults (category, text, added_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(insult)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn increment_submissions(&self, username: &str) -> anyhow::Result<i64> {
        let row = sqlx::query(
            "INSERT INTO users (username, submissions) VALUES (?, 1)
             ON CONFLICT(username) DO UPDATE SET submissions = submissions + 1
             RETURNING submissions",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("submissions"))
    }

    async fn top_submitters(&self, limit: u32) -> anyhow::Result<Vec<UserTally>> {
        let rows = sqlx::query(
            "SELECT username, submissions FROM users ORDER BY submissions DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| UserTally {
                username: row.get("username"),
                submissions: row.get("submissions"),
            })
            .collect())
    }
}
