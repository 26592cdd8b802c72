//! Persistence of notification records.
//!
//! `PgNotificationStore` is the production backend. `MemoryNotificationStore`
//! has identical transition semantics and is used where no database is available.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;

use notifyhub_common::error::AppError;
use notifyhub_common::types::{NotificationRecord, NotificationStatus};

/// Keyed storage for notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a new record. Fails with `Conflict` if the id already exists.
    async fn insert(&self, record: &NotificationRecord) -> Result<(), AppError>;

    async fn get(&self, id: &str) -> Result<Option<NotificationRecord>, AppError>;

    /// Move a record to `next`, atomically checking the current status is a
    /// legal predecessor. Fails with `NotFound` or `Conflict`.
    async fn transition(&self, id: &str, next: NotificationStatus) -> Result<(), AppError>;

    /// Remove a record. Returns true if it existed.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

fn illegal_transition(id: &str, current: NotificationStatus, next: NotificationStatus) -> AppError {
    AppError::Conflict(format!(
        "Notification {} cannot move from {} to {}",
        id, current, next
    ))
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Notification {} not found", id))
}

/// PostgreSQL-backed store over the `notifications` table.
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, record: &NotificationRecord) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient, message, channels, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.recipient)
        .bind(&record.message)
        .bind(&record.channels)
        .bind(record.status.to_string())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Notification {} already exists",
                record.id
            )));
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<NotificationRecord>, AppError> {
        let record: Option<NotificationRecord> =
            sqlx::query_as("SELECT * FROM notifications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record)
    }

    async fn transition(&self, id: &str, next: NotificationStatus) -> Result<(), AppError> {
        let allowed: Vec<String> = next.predecessors().iter().map(|s| s.to_string()).collect();

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = ANY($3)
            "#,
        )
        .bind(next.to_string())
        .bind(id)
        .bind(&allowed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing updated: either the id is unknown or the current status forbids the move
        match self.get(id).await? {
            None => Err(not_found(id)),
            Some(record) => Err(illegal_transition(id, record.status, next)),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-memory store guarded by a single `RwLock`.
#[derive(Default)]
pub struct MemoryNotificationStore {
    records: RwLock<HashMap<String, NotificationRecord>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, record: &NotificationRecord) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(AppError::Conflict(format!(
                "Notification {} already exists",
                record.id
            )));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<NotificationRecord>, AppError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn transition(&self, id: &str, next: NotificationStatus) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(id).ok_or_else(|| not_found(id))?;

        if !record.status.can_transition_to(next) {
            return Err(illegal_transition(id, record.status, next));
        }
        record.status = next;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.records.write().await.remove(id).is_some())
    }
}
