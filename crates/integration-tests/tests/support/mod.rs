//! Shared fixtures: a real router over an in-memory SQLite store and a chat
//! platform that records what it was asked to do.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use kate_api::AppState;
use kate_core::models::{Announcement, MessageRef, ModerationNotice, ReactionEvent, CHECKMARK};
use kate_core::traits::{ChatPlatform, InsultRepo};
use kate_db_sqlite::SqliteStore;
use kate_services::{
    AcceptancePublisher, CatalogService, SubmissionService, VoteRegistry, VoteSettings,
};
use serde_json::Value;
use tower::ServiceExt;

pub const CHANNEL_ID: u64 = 900;

#[derive(Default)]
pub struct RecordingChat {
    next_id: AtomicU64,
    fail_posts: AtomicBool,
    pub posts: Mutex<Vec<(MessageRef, ModerationNotice)>>,
    pub reactions: Mutex<Vec<(MessageRef, String)>>,
    pub announcements: Mutex<Vec<Announcement>>,
}

impl RecordingChat {
    pub fn fail_posts(&self) {
        self.fail_posts.store(true, Ordering::SeqCst);
    }

    pub fn posts(&self) -> Vec<(MessageRef, ModerationNotice)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn reactions(&self) -> Vec<(MessageRef, String)> {
        self.reactions.lock().unwrap().clone()
    }

    pub fn announcements(&self) -> Vec<Announcement> {
        self.announcements.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatform for RecordingChat {
    async fn post_moderation(&self, notice: &ModerationNotice) -> anyhow::Result<MessageRef> {
        if self.fail_posts.load(Ordering::SeqCst) {
            anyhow::bail!("channel {CHANNEL_ID} not found");
        }
        let message = MessageRef {
            channel_id: CHANNEL_ID,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        };
        self.posts.lock().unwrap().push((message, notice.clone()));
        Ok(message)
    }

    async fn seed_reaction(&self, message: &MessageRef, emoji: &str) -> anyhow::Result<()> {
        self.reactions
            .lock()
            .unwrap()
            .push((*message, emoji.to_string()));
        Ok(())
    }

    async fn announce(&self, announcement: &Announcement) -> anyhow::Result<()> {
        self.announcements
            .lock()
            .unwrap()
            .push(announcement.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<SqliteStore>,
    pub chat: Arc<RecordingChat>,
    pub votes: Arc<VoteRegistry>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_votes(VoteSettings::default()).await
    }

    pub async fn with_votes(settings: VoteSettings) -> Self {
        let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
        store.create_category("pingInsults").await.unwrap();
        let chat = Arc::new(RecordingChat::default());

        let publisher = Arc::new(AcceptancePublisher::new(store.clone(), chat.clone()));
        let votes = Arc::new(VoteRegistry::new(settings, publisher));
        let state = AppState {
            submissions: Arc::new(SubmissionService::new(
                store.clone(),
                store.clone(),
                chat.clone(),
                votes.clone(),
            )),
            catalog: Arc::new(CatalogService::new(store.clone(), store.clone())),
            votes: votes.clone(),
        };
        let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../public");

        Self {
            router: kate_api::router(state, static_dir),
            store,
            chat,
            votes,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.get(uri).await;
        (status, parse(&body))
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, parse(&body))
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    /// Simulates a gateway reaction-add event.
    pub async fn react(&self, message: MessageRef, user_id: u64, user_is_bot: bool) -> bool {
        self.votes
            .dispatch(ReactionEvent {
                message_id: message.message_id,
                user_id,
                user_is_bot,
                emoji: CHECKMARK.to_string(),
            })
            .await
    }

    pub async fn stored_insults(&self, category: &str) -> Option<Vec<String>> {
        self.store
            .get_category(category)
            .await
            .unwrap()
            .map(|c| c.insults)
    }
}

fn parse(body: &[u8]) -> Value {
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).unwrap()
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
