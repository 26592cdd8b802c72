//! Notification intake and status routes.

use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use notifyhub_common::error::AppError;
use notifyhub_common::types::{
    ChannelType, NotificationRecord, NotificationRequest, NotificationStatus, new_notification_id,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send", post(send_notification))
        .route("/status/{id}", get(get_status))
}

/// Request body for POST /send.
#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub channels: Vec<String>,
    /// Accepted for compatibility; not interpreted.
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// Response for an accepted notification.
#[derive(Debug, Serialize)]
pub struct SendNotificationResponse {
    pub status: NotificationStatus,
    pub message_id: String,
    pub channels: Vec<String>,
}

/// Response for GET /status/:id.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: NotificationStatus,
    pub updated_at: DateTime<Utc>,
}

/// Check required fields and that every channel is supported (case-insensitive).
pub fn validate(req: &SendNotificationRequest) -> Result<(), AppError> {
    if req.user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id is required".to_string()));
    }
    if req.message.trim().is_empty() {
        return Err(AppError::Validation("message is required".to_string()));
    }
    if req.channels.is_empty() {
        return Err(AppError::Validation(
            "channels must not be empty".to_string(),
        ));
    }
    for channel in &req.channels {
        ChannelType::from_str(channel).map_err(AppError::Validation)?;
    }
    Ok(())
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    match rejection.status() {
        StatusCode::UNSUPPORTED_MEDIA_TYPE => AppError::UnsupportedMediaType(rejection.body_text()),
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(rejection.body_text()),
        _ => AppError::Validation(format!("Invalid JSON: {}", rejection.body_text())),
    }
}

/// POST /send: persist a notification as `queued` and publish it to the queue.
async fn send_notification(
    State(state): State<AppState>,
    payload: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SendNotificationResponse>), AppError> {
    let Json(req) = payload.map_err(rejection_to_error)?;
    validate(&req)?;

    let request = NotificationRequest {
        id: new_notification_id(),
        recipient: req.user_id,
        message: req.message,
        channels: req.channels,
    };

    state
        .store
        .insert(&NotificationRecord::queued(&request))
        .await?;

    if let Err(e) = state.publisher.publish(&request).await {
        tracing::error!(id = %request.id, error = %e, "Failed to enqueue notification");

        // Never leave a record behind that no worker will pick up
        if let Err(cleanup) = state.store.delete(&request.id).await {
            tracing::error!(
                id = %request.id,
                error = %cleanup,
                "Failed to remove unqueued notification record"
            );
        }
        return Err(e);
    }

    tracing::info!(
        id = %request.id,
        recipient = %request.recipient,
        channels = ?request.channels,
        "Notification queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(SendNotificationResponse {
            status: NotificationStatus::Queued,
            message_id: request.id,
            channels: request.channels,
        }),
    ))
}

/// GET /status/{id}: current status of a notification.
async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let record = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;

    Ok(Json(StatusResponse {
        id: record.id,
        status: record.status,
        updated_at: record.updated_at,
    }))
}
