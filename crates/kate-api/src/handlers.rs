//! # kate-api Handlers
//!
//! Coordinates the flow between HTTP requests and the services.

use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::Json;
use kate_core::error::AppError;
use kate_core::models::{PendingSubmission, SubmissionRequest, UserTally};
use kate_services::{
    CatalogService, SubmissionService, SubmitOutcome, VoteRegistry, DEFAULT_LEADERBOARD_LIMIT,
    DUPLICATE_INSULT,
};
use kate_ui::IndexTemplate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::ASSETS_PREFIX;

/// Services shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub submissions: Arc<SubmissionService>,
    pub catalog: Arc<CatalogService>,
    pub votes: Arc<VoteRegistry>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<UserTally>,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub pending: Vec<PendingSubmission>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Renders the submission form.
pub async fn index() -> Result<Html<String>, ApiError> {
    let page = IndexTemplate {
        title: "Kate",
        assets: ASSETS_PREFIX,
    };
    page.render()
        .map(Html)
        .map_err(|e| AppError::Internal(format!("rendering index: {e}")).into())
}

pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let categories = state.catalog.list_categories().await?;
    Ok(Json(CategoriesResponse { categories }))
}

/// Responds once the moderation message is posted; the vote and any
/// persistence happen after this returns.
pub async fn submit_insult(
    State(state): State<AppState>,
    Json(request): Json<SubmissionRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    debug!(?request, "received submission");
    let response = match state.submissions.submit(request).await? {
        SubmitOutcome::Submitted(_) => SubmitResponse::accepted(),
        SubmitOutcome::Duplicate => SubmitResponse::failure(DUPLICATE_INSULT),
    };
    Ok(Json(response))
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    let leaderboard = state.catalog.leaderboard(limit).await?;
    Ok(Json(LeaderboardResponse { leaderboard }))
}

/// Submissions whose vote is still open.
pub async fn pending_submissions(State(state): State<AppState>) -> Json<PendingResponse> {
    Json(PendingResponse {
        pending: state.votes.in_flight(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
