//! # kate-configs
//!
//! Layered settings: built-in defaults, an optional `kate.toml` (or the file
//! named by `KATE_CONFIG`), `KATE__SECTION__KEY` environment variables, and
//! finally the plain variables older deployments already set
//! (`DISCORD_TOKEN`, `DISCORD_CHANNEL_ID`, `WEBHOOK_ID`, `WEBHOOK_TOKEN`,
//! `DATABASE_URL`, `PORT`).

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;

const LEGACY_VARS: &[(&str, &str)] = &[
    ("DISCORD_TOKEN", "discord.token"),
    ("DISCORD_CHANNEL_ID", "discord.channel_id"),
    ("WEBHOOK_ID", "discord.webhook_id"),
    ("WEBHOOK_TOKEN", "discord.webhook_token"),
    ("DATABASE_URL", "store.database_url"),
    ("PORT", "server.port"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub discord: DiscordSettings,
    pub store: StoreSettings,
    pub votes: VoteConfig,
    pub announcer: AnnouncerSettings,
    pub mention: MentionSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    #[serde(deserialize_with = "lenient")]
    pub port: u16,
    /// Directory holding `script.js` and `style.css`.
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordSettings {
    #[serde(deserialize_with = "secret")]
    pub token: SecretString,
    /// Moderation channel receiving submissions.
    #[serde(deserialize_with = "lenient")]
    pub channel_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub webhook_id: u64,
    #[serde(deserialize_with = "secret")]
    pub webhook_token: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(deserialize_with = "secret")]
    pub database_url: SecretString,
    /// Categories created at start-up when missing.
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteConfig {
    pub emoji: String,
    #[serde(deserialize_with = "lenient")]
    pub window_ms: u64,
    #[serde(deserialize_with = "lenient")]
    pub threshold: usize,
}

impl VoteConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Identity used for webhook announcements.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncerSettings {
    pub username: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MentionSettings {
    /// Category the mention replies are drawn from.
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

impl Settings {
    /// Reads `.env`, the optional config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("no .env loaded: {e}");
        }
        let file = std::env::var("KATE_CONFIG").unwrap_or_else(|_| "kate".to_string());
        Self::from_sources(Some(&file), std::env::vars().collect())
    }

    /// Builds settings from an optional file and an explicit variable map.
    pub fn from_sources(
        file: Option<&str>,
        vars: config::Map<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000_i64)?
            .set_default("server.static_dir", "public")?
            .set_default("store.database_url", "sqlite://kate.db")?
            .set_default("store.categories", vec!["pingInsults"])?
            .set_default("votes.emoji", "✅")?
            .set_default("votes.window_ms", 6_000_000_i64)?
            .set_default("votes.threshold", 1_i64)?
            .set_default("announcer.username", "Kate")?
            .set_default("announcer.avatar_url", "https://i.imgur.com/CCoyl1E.png")?
            .set_default("mention.category", "pingInsults")?
            .set_default("log.filter", "info")?
            .set_default("log.format", "pretty")?;

        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("KATE")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("store.categories")
                .try_parsing(true)
                .source(Some(vars.clone())),
        );

        for (var, key) in LEGACY_VARS {
            builder = builder.set_override_option(*key, vars.get(*var).cloned())?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.votes.threshold == 0 {
            return Err(ConfigError::Invalid("votes.threshold must be at least 1".into()));
        }
        if self.votes.window_ms == 0 {
            return Err(ConfigError::Invalid("votes.window_ms must be positive".into()));
        }
        if self.votes.emoji.trim().is_empty() {
            return Err(ConfigError::Invalid("votes.emoji must not be empty".into()));
        }
        if self.store.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid("store.categories contains a blank key".into()));
        }
        Ok(())
    }
}

fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Accepts a native value or its string form, so plain environment
/// variables can fill numeric fields.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Value(T),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Value(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}
