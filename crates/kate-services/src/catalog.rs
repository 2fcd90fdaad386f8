//! Read-only views consumed by the front-end.

use std::sync::Arc;

use kate_core::error::{AppError, Result};
use kate_core::models::UserTally;
use kate_core::traits::{InsultRepo, UserRepo};

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

pub struct CatalogService {
    insults: Arc<dyn InsultRepo>,
    users: Arc<dyn UserRepo>,
}

impl CatalogService {
    pub fn new(insults: Arc<dyn InsultRepo>, users: Arc<dyn UserRepo>) -> Self {
        Self { insults, users }
    }

    /// Every category document key, in store order.
    pub async fn list_categories(&self) -> Result<Vec<String>> {
        self.insults
            .list_category_keys()
            .await
            .map_err(AppError::store)
    }

    /// Top submitters by tally. Ties keep the store's order.
    pub async fn leaderboard(&self, limit: u32) -> Result<Vec<UserTally>> {
        let limit = limit.clamp(1, MAX_LEADERBOARD_LIMIT);
        self.users
            .top_submitters(limit)
            .await
            .map_err(AppError::store)
    }
}
