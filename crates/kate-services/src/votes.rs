//! # Vote Collector
//!
//! Each moderation message gets a `VoteCollector`, an explicit state machine
//! `Idle -> Armed -> {Resolved, Expired}`. The `VoteRegistry` owns every
//! armed collector, keyed by message id, so in-flight submissions can be
//! enumerated instead of hiding inside a closure.
//!
//! Collectors are in-memory only. A restart drops every open vote.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kate_core::models::{MessageRef, PendingSubmission, ReactionEvent, CHECKMARK};
use tracing::{debug, info};

/// Six million milliseconds, i.e. 100 minutes.
pub const DEFAULT_VOTE_WINDOW: Duration = Duration::from_millis(6_000_000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteSettings {
    /// Only reactions with this emoji are counted.
    pub emoji: String,
    /// How long a collector stays armed.
    pub window: Duration,
    /// Distinct human reactors needed to accept.
    pub threshold: usize,
}

impl Default for VoteSettings {
    fn default() -> Self {
        Self {
            emoji: CHECKMARK.to_string(),
            window: DEFAULT_VOTE_WINDOW,
            threshold: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Armed,
    Resolved,
    Expired,
}

/// Emitted exactly once, when a collector resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acceptance {
    pub submission: PendingSubmission,
    pub accepted_at: DateTime<Utc>,
}

impl Acceptance {
    pub fn voters(&self) -> &[u64] {
        &self.submission.reactors
    }
}

/// Runs after a vote resolves, outside of any HTTP request.
/// Implementations log their own failures; nothing is reported back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AcceptanceHandler: Send + Sync {
    async fn on_accepted(&self, acceptance: Acceptance);
}

/// Vote state for a single moderation message.
#[derive(Debug, Clone)]
pub struct VoteCollector {
    pending: PendingSubmission,
    state: CollectorState,
    emoji: String,
    threshold: usize,
}

impl VoteCollector {
    pub fn new(pending: PendingSubmission, settings: &VoteSettings) -> Self {
        Self {
            pending,
            state: CollectorState::Idle,
            emoji: settings.emoji.clone(),
            threshold: settings.threshold.max(1),
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn pending(&self) -> &PendingSubmission {
        &self.pending
    }

    pub fn arm(&mut self) {
        if self.state == CollectorState::Idle {
            self.state = CollectorState::Armed;
        }
    }

    /// Feeds one reaction event. Returns the acceptance on the transition to
    /// `Resolved`; every other call, including all later ones, returns `None`.
    ///
    /// Bot-authored reactions never count, so the seed reaction cannot
    /// accept a submission on its own.
    pub fn observe(&mut self, event: &ReactionEvent) -> Option<Acceptance> {
        if self.state != CollectorState::Armed
            || event.message_id != self.pending.message.message_id
            || event.emoji != self.emoji
            || event.user_is_bot
        {
            return None;
        }

        if !self.pending.reactors.contains(&event.user_id) {
            self.pending.reactors.push(event.user_id);
        }
        if self.pending.reactors.len() < self.threshold {
            return None;
        }

        self.state = CollectorState::Resolved;
        Some(Acceptance {
            submission: self.pending.clone(),
            accepted_at: Utc::now(),
        })
    }

    /// Returns `true` if this call moved the collector to `Expired`.
    pub fn expire(&mut self) -> bool {
        if self.state == CollectorState::Armed {
            self.state = CollectorState::Expired;
            true
        } else {
            false
        }
    }
}

/// Registry of armed collectors, keyed by moderation message id.
pub struct VoteRegistry {
    collectors: Arc<DashMap<u64, VoteCollector>>,
    handler: Arc<dyn AcceptanceHandler>,
    settings: VoteSettings,
}

impl VoteRegistry {
    pub fn new(settings: VoteSettings, handler: Arc<dyn AcceptanceHandler>) -> Self {
        Self {
            collectors: Arc::new(DashMap::new()),
            handler,
            settings,
        }
    }

    pub fn settings(&self) -> &VoteSettings {
        &self.settings
    }

    /// Starts listening for votes on `message` and schedules its expiry.
    /// Must be called from within a tokio runtime.
    pub fn arm(
        &self,
        category: String,
        insult: String,
        submitter: String,
        message: MessageRef,
    ) -> PendingSubmission {
        let armed_at = Utc::now();
        let deadline = chrono::Duration::from_std(self.settings.window)
            .ok()
            .and_then(|window| armed_at.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let pending = PendingSubmission {
            category,
            insult,
            submitter,
            message,
            reactors: Vec::new(),
            armed_at,
            deadline,
        };

        let mut collector = VoteCollector::new(pending.clone(), &self.settings);
        collector.arm();
        self.collectors.insert(message.message_id, collector);
        debug!(message_id = message.message_id, deadline = %deadline, "vote collector armed");

        let collectors = Arc::clone(&self.collectors);
        let window = self.settings.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            expire(&collectors, message.message_id);
        });

        pending
    }

    /// Routes a reaction to the collector of its message.
    ///
    /// Returns `true` when this event resolved the vote; the acceptance
    /// handler has completed by the time this returns.
    pub async fn dispatch(&self, event: ReactionEvent) -> bool {
        let acceptance = match self.collectors.get_mut(&event.message_id) {
            Some(mut collector) => collector.observe(&event),
            None => return false,
        };
        let Some(acceptance) = acceptance else {
            return false;
        };

        self.collectors.remove(&event.message_id);
        info!(
            message_id = event.message_id,
            category = %acceptance.submission.category,
            voters = ?acceptance.voters(),
            "submission accepted"
        );
        self.handler.on_accepted(acceptance).await;
        true
    }

    pub fn is_tracking(&self, message_id: u64) -> bool {
        self.collectors.contains_key(&message_id)
    }

    pub fn state(&self, message_id: u64) -> Option<CollectorState> {
        self.collectors.get(&message_id).map(|c| c.state())
    }

    /// Submissions still waiting for votes, oldest first.
    pub fn in_flight(&self) -> Vec<PendingSubmission> {
        let mut pending: Vec<_> = self
            .collectors
            .iter()
            .filter(|entry| entry.state() == CollectorState::Armed)
            .map(|entry| entry.pending().clone())
            .collect();
        pending.sort_by_key(|p| p.armed_at);
        pending
    }
}

fn expire(collectors: &DashMap<u64, VoteCollector>, message_id: u64) {
    let removed = collectors.remove_if(&message_id, |_, c| c.state() == CollectorState::Armed);
    if let Some((_, mut collector)) = removed {
        collector.expire();
        info!(
            message_id,
            category = %collector.pending().category,
            "vote window elapsed without acceptance"
        );
    }
}
