//! HTTP handlers

mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub use health::{health, ready};

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(state)
}
