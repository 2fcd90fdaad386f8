//! # Domain Models
//!
//! Entities shared by the workflows, the HTTP layer and the plugins.
//! Durable state (categories, user tallies) lives in the document store;
//! `PendingSubmission` only ever lives in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Emoji used both as the seed reaction and as the vote filter.
pub const CHECKMARK: &str = "✅";

/// Footer shown under every moderation message.
pub const MODERATION_FOOTER: &str = "React to vote";

/// A named bucket of accepted insults, stored as one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Document key, e.g. `pingInsults`
    pub key: String,
    /// Accepted insults in insertion order. Never contains duplicates
    /// as long as every write goes through the append operation.
    pub insults: Vec<String>,
}

impl Category {
    /// Exact, case-sensitive membership.
    pub fn contains(&self, text: &str) -> bool {
        self.insults.iter().any(|insult| insult == text)
    }
}

/// Per-user counter of submission attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTally {
    /// Display name as typed into the form; used directly as the key.
    pub username: String,
    pub submissions: i64,
}

/// Body of `POST /submit-insult`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubmissionRequest {
    pub username: String,
    pub insult: String,
    pub category: String,
}

/// Address of a message posted on the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: u64,
    pub message_id: u64,
}

/// Content of the message that solicits votes for a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationNotice {
    pub category: String,
    pub insult: String,
    pub submitter: String,
}

impl ModerationNotice {
    pub fn title(&self) -> String {
        format!("New Insult Submission: {}", format_category_name(&self.category))
    }
}

/// Out-of-band notice sent once an insult has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub category: String,
    pub insult: String,
    /// Chat-platform user ids of the accepting voters.
    pub voters: Vec<u64>,
}

impl Announcement {
    pub const TITLE: &'static str = "Insult Added";

    pub fn description(&self) -> String {
        let voters = self
            .voters
            .iter()
            .map(|id| format!("<@{id}>"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "The insult \"{}\" has been added to the database and upvoted by users: {}.",
            self.insult, voters
        )
    }
}

/// A reaction-add event, reduced to what the vote collector needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub message_id: u64,
    pub user_id: u64,
    pub user_is_bot: bool,
    /// Unicode emoji, or the name of a custom emoji.
    pub emoji: String,
}

/// A submission that passed the duplicate check and is waiting for votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSubmission {
    pub category: String,
    pub insult: String,
    pub submitter: String,
    pub message: MessageRef,
    /// Distinct human reactors seen so far.
    pub reactors: Vec<u64>,
    pub armed_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

/// Turns a category key into a human label: a space goes before every
/// internal uppercase ASCII letter and the first character is uppercased.
///
/// `pingInsults` becomes `Ping Insults`.
pub fn format_category_name(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    let mut previous: Option<char> = None;
    for ch in key.chars() {
        if ch.is_ascii_uppercase() && previous.is_some_and(|p| p != ' ') {
            spaced.push(' ');
        }
        spaced.push(ch);
        previous = Some(ch);
    }

    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
