//! Shared application state for the Axum API server.

use std::sync::Arc;

use notifyhub_common::queue::NotificationPublisher;
use notifyhub_notifier::store::NotificationStore;

/// Application state shared across all route handlers via Axum `State`.
///
/// The publisher and store are injected at construction, so a handler can never
/// observe an uninitialized queue.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NotificationStore>,
    pub publisher: Arc<dyn NotificationPublisher>,
}

impl AppState {
    pub fn new(store: Arc<dyn NotificationStore>, publisher: Arc<dyn NotificationPublisher>) -> Self {
        Self { store, publisher }
    }
}
