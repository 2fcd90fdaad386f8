//! # kate-api
//!
//! The HTTP surface: JSON endpoints used by the submission form, the form
//! page itself and its static assets.

pub mod error;
pub mod handlers;
pub mod middleware;

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;

pub use handlers::AppState;

/// Prefix the static assets are mounted under.
pub const ASSETS_PREFIX: &str = "/static";

/// Builds the application router. `static_dir` holds `script.js` and
/// `style.css`.
pub fn router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/get-categories", get(handlers::get_categories))
        .route("/submit-insult", post(handlers::submit_insult))
        .route("/leaderboard", get(handlers::leaderboard))
        .route("/pending-submissions", get(handlers::pending_submissions))
        .route("/health", get(handlers::health))
        .nest_service(ASSETS_PREFIX, ServeDir::new(static_dir))
        .layer(middleware::cors_policy())
        .layer(middleware::standard_middleware())
        .with_state(state)
}
