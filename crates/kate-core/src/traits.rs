//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! Adapters report failures as `anyhow::Error`; the services decide how
//! they surface.

use async_trait::async_trait;

use crate::models::{Announcement, Category, MessageRef, ModerationNotice, UserTally};

/// Document-store contract for the `insults` collection.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait InsultRepo: Send + Sync {
    /// `None` when no document exists for `key`.
    async fn get_category(&self, key: &str) -> anyhow::Result<Option<Category>>;
    async fn list_category_keys(&self) -> anyhow::Result<Vec<String>>;
    /// Creates an empty category document. No-op when it already exists.
    async fn create_category(&self, key: &str) -> anyhow::Result<()>;
    /// Array-union append: an existing text is left as is.
    /// Fails when the category document does not exist.
    async fn append_insult(&self, key: &str, insult: &str) -> anyhow::Result<()>;
}

/// Document-store contract for the `users` collection.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Creates the user on first use. Returns the new tally.
    async fn increment_submissions(&self, username: &str) -> anyhow::Result<i64>;
    /// Highest tallies first.
    async fn top_submitters(&self, limit: u32) -> anyhow::Result<Vec<UserTally>>;
}

/// Chat-platform contract used by the submission workflow.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Posts the vote request to the moderation channel.
    async fn post_moderation(&self, notice: &ModerationNotice) -> anyhow::Result<MessageRef>;
    async fn seed_reaction(&self, message: &MessageRef, emoji: &str) -> anyhow::Result<()>;
    /// Sends the acceptance notice through the webhook.
    async fn announce(&self, announcement: &Announcement) -> anyhow::Result<()>;
}
