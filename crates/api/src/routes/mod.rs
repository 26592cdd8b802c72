pub mod health;
pub mod notifications;

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::AppState;

/// Maximum accepted request body size (1 MiB).
pub const MAX_BODY_BYTES: usize = 1 << 20;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(notifications::router())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
