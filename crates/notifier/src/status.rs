//! Status tracker: sole writer of a notification's lifecycle status.

use std::sync::Arc;

use notifyhub_common::error::AppError;
use notifyhub_common::types::NotificationStatus;

use crate::store::NotificationStore;

#[derive(Clone)]
pub struct StatusTracker {
    store: Arc<dyn NotificationStore>,
}

impl StatusTracker {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Record `next` as the status of `id`.
    ///
    /// Out-of-order writes (anything outside `queued → sending → terminal`)
    /// are rejected with `AppError::Conflict`.
    pub async fn set_status(&self, id: &str, next: NotificationStatus) -> Result<(), AppError> {
        self.store.transition(id, next).await?;
        tracing::info!(id, status = %next, "Status updated");
        Ok(())
    }

    /// Current status of `id`, or `AppError::NotFound` for an unknown id.
    pub async fn get_status(&self, id: &str) -> Result<NotificationStatus, AppError> {
        self.store
            .get(id)
            .await?
            .map(|record| record.status)
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))
    }
}
