//! Replies to bot mentions with a random stored insult.

use std::sync::Arc;

use kate_core::traits::InsultRepo;
use rand::seq::IndexedRandom;
use tracing::{error, warn};

pub const MISSING_CATEGORY_REPLY: &str = "Document does not exist";
pub const EMPTY_CATEGORY_REPLY: &str = "No insults available";
pub const READ_FAILED_REPLY: &str = "Error fetching insult";

pub struct MentionResponder {
    insults: Arc<dyn InsultRepo>,
    category: String,
}

impl MentionResponder {
    pub fn new(insults: Arc<dyn InsultRepo>, category: impl Into<String>) -> Self {
        Self {
            insults,
            category: category.into(),
        }
    }

    /// Never fails: store problems turn into one of the fallback replies.
    pub async fn respond(&self) -> String {
        match self.insults.get_category(&self.category).await {
            Ok(Some(category)) => match pick(&category.insults) {
                Some(insult) => insult,
                None => {
                    warn!(category = %self.category, "no insults available for mention reply");
                    EMPTY_CATEGORY_REPLY.to_string()
                }
            },
            Ok(None) => {
                warn!(category = %self.category, "mention category does not exist");
                MISSING_CATEGORY_REPLY.to_string()
            }
            Err(e) => {
                error!(category = %self.category, error = %format!("{e:#}"), "failed to fetch insult");
                READ_FAILED_REPLY.to_string()
            }
        }
    }
}

fn pick(insults: &[String]) -> Option<String> {
    insults.choose(&mut rand::rng()).cloned()
}
