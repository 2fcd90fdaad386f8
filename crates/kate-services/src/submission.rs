//! # Submission Workflow
//!
//! `submit` runs inside the HTTP request and returns as soon as the
//! moderation message is posted and the tally is bumped. Acceptance,
//! persistence and the announcement happen strictly later, from the
//! vote registry, through `AcceptancePublisher`.

use std::sync::Arc;

use async_trait::async_trait;
use kate_core::error::{AppError, Result};
use kate_core::models::{Announcement, ModerationNotice, PendingSubmission, SubmissionRequest};
use kate_core::traits::{ChatPlatform, InsultRepo, UserRepo};
use tracing::{error, info};

use crate::duplicate::DuplicateChecker;
use crate::votes::{Acceptance, AcceptanceHandler, VoteRegistry};

pub const DUPLICATE_INSULT: &str = "Duplicate insult";
pub const NO_CATEGORY_SELECTED: &str = "No category selected";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Posted for moderation; the vote is running.
    Submitted(PendingSubmission),
    /// Already stored in the category. Nothing was posted or counted.
    Duplicate,
}

pub struct SubmissionService {
    duplicates: DuplicateChecker,
    users: Arc<dyn UserRepo>,
    chat: Arc<dyn ChatPlatform>,
    votes: Arc<VoteRegistry>,
}

impl SubmissionService {
    pub fn new(
        insults: Arc<dyn InsultRepo>,
        users: Arc<dyn UserRepo>,
        chat: Arc<dyn ChatPlatform>,
        votes: Arc<VoteRegistry>,
    ) -> Self {
        Self {
            duplicates: DuplicateChecker::new(insults),
            users,
            chat,
            votes,
        }
    }

    /// Nothing is rolled back on failure: a collector armed before a later
    /// error keeps running.
    pub async fn submit(&self, request: SubmissionRequest) -> Result<SubmitOutcome> {
        validate(&request)?;
        let SubmissionRequest {
            username,
            insult,
            category,
        } = request;

        if self.duplicates.is_duplicate(&category, &insult).await? {
            info!(%category, %username, "rejected duplicate insult");
            return Ok(SubmitOutcome::Duplicate);
        }

        let notice = ModerationNotice {
            category: category.clone(),
            insult: insult.clone(),
            submitter: username.clone(),
        };
        let message = self
            .chat
            .post_moderation(&notice)
            .await
            .map_err(|e| AppError::ChannelUnavailable(format!("{e:#}")))?;

        // Armed before seeding so an early human vote is not lost.
        let pending = self.votes.arm(category, insult, username.clone(), message);

        self.chat
            .seed_reaction(&message, &self.votes.settings().emoji)
            .await
            .map_err(AppError::chat)?;

        let tally = self
            .users
            .increment_submissions(&username)
            .await
            .map_err(AppError::store)?;

        info!(
            category = %pending.category,
            %username,
            tally,
            message_id = message.message_id,
            "submission posted for moderation"
        );
        Ok(SubmitOutcome::Submitted(pending))
    }
}

fn validate(request: &SubmissionRequest) -> Result<()> {
    if request.category.trim().is_empty() {
        return Err(AppError::ValidationError(NO_CATEGORY_SELECTED.into()));
    }
    if request.username.trim().is_empty() {
        return Err(AppError::ValidationError("Username is required".into()));
    }
    if request.insult.trim().is_empty() {
        return Err(AppError::ValidationError("Insult is required".into()));
    }
    Ok(())
}

/// Persists accepted insults and announces them.
pub struct AcceptancePublisher {
    insults: Arc<dyn InsultRepo>,
    chat: Arc<dyn ChatPlatform>,
}

impl AcceptancePublisher {
    pub fn new(insults: Arc<dyn InsultRepo>, chat: Arc<dyn ChatPlatform>) -> Self {
        Self { insults, chat }
    }
}

#[async_trait]
impl AcceptanceHandler for AcceptancePublisher {
    async fn on_accepted(&self, acceptance: Acceptance) {
        let submission = &acceptance.submission;

        if let Err(e) = self
            .insults
            .append_insult(&submission.category, &submission.insult)
            .await
        {
            error!(
                category = %submission.category,
                error = %format!("{e:#}"),
                "failed to store accepted insult"
            );
            return;
        }
        info!(category = %submission.category, insult = %submission.insult, "insult added");

        let announcement = Announcement {
            category: submission.category.clone(),
            insult: submission.insult.clone(),
            voters: acceptance.voters().to_vec(),
        };
        if let Err(e) = self.chat.announce(&announcement).await {
            error!(error = %format!("{e:#}"), "failed to send acceptance announcement");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::votes::{MockAcceptanceHandler, VoteSettings};
    use chrono::Utc;
    use kate_core::models::{Category, MessageRef, ReactionEvent, CHECKMARK};
    use kate_core::traits::{MockChatPlatform, MockInsultRepo, MockUserRepo};

    const MESSAGE: MessageRef = MessageRef {
        channel_id: 7,
        message_id: 42,
    };

    fn request(insult: &str) -> SubmissionRequest {
        SubmissionRequest {
            username: "alice".into(),
            insult: insult.into(),
            category: "pingInsults".into(),
        }
    }

    fn stored(insults: &'static [&'static str]) -> MockInsultRepo {
        let mut repo = MockInsultRepo::new();
        repo.expect_get_category().returning(move |key| {
            Ok(Some(Category {
                key: key.to_string(),
                insults: insults.iter().map(|s| s.to_string()).collect(),
            }))
        });
        repo
    }

    fn idle_votes() -> Arc<VoteRegistry> {
        let mut handler = MockAcceptanceHandler::new();
        handler.expect_on_accepted().never();
        Arc::new(VoteRegistry::new(VoteSettings::default(), Arc::new(handler)))
    }

    #[tokio::test]
    async fn duplicate_short_circuits_before_side_effects() {
        let mut chat = MockChatPlatform::new();
        chat.expect_post_moderation().never();
        chat.expect_seed_reaction().never();
        let mut users = MockUserRepo::new();
        users.expect_increment_submissions().never();
        let votes = idle_votes();

        let service = SubmissionService::new(
            Arc::new(stored(&["bad joke"])),
            Arc::new(users),
            Arc::new(chat),
            votes.clone(),
        );

        let outcome = service.submit(request("bad joke")).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Duplicate);
        assert!(votes.in_flight().is_empty());
    }

    #[tokio::test]
    async fn new_insult_posts_once_seeds_once_and_counts_once() {
        let mut chat = MockChatPlatform::new();
        chat.expect_post_moderation()
            .withf(|n| n.title() == "New Insult Submission: Ping Insults" && n.submitter == "alice")
            .times(1)
            .returning(|_| Ok(MESSAGE));
        chat.expect_seed_reaction()
            .withf(|m, emoji| *m == MESSAGE && emoji == CHECKMARK)
            .times(1)
            .returning(|_, _| Ok(()));
        let mut users = MockUserRepo::new();
        users
            .expect_increment_submissions()
            .times(1)
            .returning(|_| Ok(1));
        let votes = idle_votes();

        let service = SubmissionService::new(
            Arc::new(stored(&[])),
            Arc::new(users),
            Arc::new(chat),
            votes.clone(),
        );

        let outcome = service.submit(request("bad joke")).await.unwrap();
        let SubmitOutcome::Submitted(pending) = outcome else {
            panic!("expected a submitted outcome");
        };
        assert_eq!(pending.message, MESSAGE);
        assert!(votes.is_tracking(MESSAGE.message_id));
    }

    #[tokio::test]
    async fn blank_category_is_rejected() {
        let service = SubmissionService::new(
            Arc::new(MockInsultRepo::new()),
            Arc::new(MockUserRepo::new()),
            Arc::new(MockChatPlatform::new()),
            idle_votes(),
        );

        let mut req = request("bad joke");
        req.category = "  ".into();
        let err = service.submit(req).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg == NO_CATEGORY_SELECTED));
    }

    #[tokio::test]
    async fn failed_post_reports_channel_unavailable() {
        let mut chat = MockChatPlatform::new();
        chat.expect_post_moderation()
            .returning(|_| Err(anyhow::anyhow!("unknown channel")));
        let mut users = MockUserRepo::new();
        users.expect_increment_submissions().never();

        let service = SubmissionService::new(
            Arc::new(stored(&[])),
            Arc::new(users),
            Arc::new(chat),
            idle_votes(),
        );

        let err = service.submit(request("bad joke")).await.unwrap_err();
        assert!(matches!(err, AppError::ChannelUnavailable(_)));
    }

    #[tokio::test]
    async fn tally_failure_keeps_the_vote_running() {
        let mut chat = MockChatPlatform::new();
        chat.expect_post_moderation().returning(|_| Ok(MESSAGE));
        chat.expect_seed_reaction().returning(|_, _| Ok(()));
        let mut users = MockUserRepo::new();
        users
            .expect_increment_submissions()
            .returning(|_| Err(anyhow::anyhow!("write conflict")));
        let votes = idle_votes();

        let service = SubmissionService::new(
            Arc::new(stored(&[])),
            Arc::new(users),
            Arc::new(chat),
            votes.clone(),
        );

        let err = service.submit(request("bad joke")).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert!(votes.is_tracking(MESSAGE.message_id));
    }

    fn acceptance() -> Acceptance {
        Acceptance {
            submission: PendingSubmission {
                category: "pingInsults".into(),
                insult: "bad joke".into(),
                submitter: "alice".into(),
                message: MESSAGE,
                reactors: vec![5],
                armed_at: Utc::now(),
                deadline: Utc::now(),
            },
            accepted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publisher_appends_then_announces_voters() {
        let mut insults = MockInsultRepo::new();
        insults
            .expect_append_insult()
            .withf(|category, insult| category == "pingInsults" && insult == "bad joke")
            .times(1)
            .returning(|_, _| Ok(()));
        let mut chat = MockChatPlatform::new();
        chat.expect_announce()
            .withf(|a| a.voters == vec![5] && a.insult == "bad joke")
            .times(1)
            .returning(|_| Ok(()));

        let publisher = AcceptancePublisher::new(Arc::new(insults), Arc::new(chat));
        publisher.on_accepted(acceptance()).await;
    }

    #[tokio::test]
    async fn publisher_skips_announcement_when_append_fails() {
        let mut insults = MockInsultRepo::new();
        insults
            .expect_append_insult()
            .returning(|_, _| Err(anyhow::anyhow!("category pingInsults does not exist")));
        let mut chat = MockChatPlatform::new();
        chat.expect_announce().never();

        let publisher = AcceptancePublisher::new(Arc::new(insults), Arc::new(chat));
        publisher.on_accepted(acceptance()).await;
    }

    #[tokio::test]
    async fn human_vote_after_submit_persists_the_insult() {
        let mut insults = stored(&[]);
        insults
            .expect_append_insult()
            .times(1)
            .returning(|_, _| Ok(()));
        let insults: Arc<dyn InsultRepo> = Arc::new(insults);

        let mut chat = MockChatPlatform::new();
        chat.expect_post_moderation().returning(|_| Ok(MESSAGE));
        chat.expect_seed_reaction().returning(|_, _| Ok(()));
        chat.expect_announce().times(1).returning(|_| Ok(()));
        let chat: Arc<dyn ChatPlatform> = Arc::new(chat);

        let mut users = MockUserRepo::new();
        users.expect_increment_submissions().returning(|_| Ok(3));

        let publisher = AcceptancePublisher::new(insults.clone(), chat.clone());
        let votes = Arc::new(VoteRegistry::new(VoteSettings::default(), Arc::new(publisher)));
        let service = SubmissionService::new(insults, Arc::new(users), chat, votes.clone());

        service.submit(request("bad joke")).await.unwrap();
        let accepted = votes
            .dispatch(ReactionEvent {
                message_id: MESSAGE.message_id,
                user_id: 5,
                user_is_bot: false,
                emoji: CHECKMARK.into(),
            })
            .await;
        assert!(accepted);
    }
}
