use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a notification request.
///
/// Transitions are monotonic: `Queued → Sending → {Sent | Failed | Partial}`.
/// `Sending → Sending` is tolerated so a request redelivered after a worker
/// crash can finish its dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Queued,
    Sending,
    Sent,
    Failed,
    Partial,
}

impl NotificationStatus {
    pub const ALL: [NotificationStatus; 5] = [
        NotificationStatus::Queued,
        NotificationStatus::Sending,
        NotificationStatus::Sent,
        NotificationStatus::Failed,
        NotificationStatus::Partial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Queued => "queued",
            NotificationStatus::Sending => "sending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Partial => "partial",
        }
    }

    /// Whether no further transition may leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NotificationStatus::Sent | NotificationStatus::Failed | NotificationStatus::Partial
        )
    }

    /// Statuses from which a transition into `self` is legal.
    pub fn predecessors(&self) -> &'static [NotificationStatus] {
        match self {
            NotificationStatus::Queued => &[],
            NotificationStatus::Sending => &[NotificationStatus::Queued, NotificationStatus::Sending],
            NotificationStatus::Sent | NotificationStatus::Failed | NotificationStatus::Partial => {
                &[NotificationStatus::Sending]
            }
        }
    }

    pub fn can_transition_to(&self, next: NotificationStatus) -> bool {
        next.predecessors().contains(self)
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown notification status: {}", s))
    }
}

/// Supported delivery media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Email,
    Telegram,
}

impl ChannelType {
    pub const ALL: [ChannelType; 2] = [ChannelType::Email, ChannelType::Telegram];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Email => "email",
            ChannelType::Telegram => "telegram",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive parse of a channel name.
impl std::str::FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unsupported channel: {}", s))
    }
}

/// A validated notification request, as handed from the ingestion boundary to
/// the dispatcher. This is also the serialized queue message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: String,
    /// Opaque user identifier (chat id for Telegram, address for email).
    #[serde(rename = "user_id")]
    pub recipient: String,
    pub message: String,
    /// Channel names in request order. Duplicates are dispatched independently.
    pub channels: Vec<String>,
}

/// A persisted notification row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationRecord {
    pub id: String,
    pub recipient: String,
    pub message: String,
    pub channels: Vec<String>,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Build a fresh `queued` record for a request.
    pub fn queued(request: &NotificationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: request.id.clone(),
            recipient: request.recipient.clone(),
            message: request.message.clone(),
            channels: request.channels.clone(),
            status: NotificationStatus::Queued,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Generate a new notification identifier: `msg_` followed by 32 hex chars.
pub fn new_notification_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_transitions() {
        use NotificationStatus::*;

        assert!(Queued.can_transition_to(Sending));
        assert!(Sending.can_transition_to(Sending));
        assert!(Sending.can_transition_to(Sent));
        assert!(Sending.can_transition_to(Failed));
        assert!(Sending.can_transition_to(Partial));

        assert!(!Queued.can_transition_to(Sent));
        assert!(!Queued.can_transition_to(Queued));
        assert!(!Sending.can_transition_to(Queued));
        for terminal in [Sent, Failed, Partial] {
            for next in NotificationStatus::ALL {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} must not transition to {}",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_status_terminal() {
        assert!(!NotificationStatus::Queued.is_terminal());
        assert!(!NotificationStatus::Sending.is_terminal());
        assert!(NotificationStatus::Sent.is_terminal());
        assert!(NotificationStatus::Failed.is_terminal());
        assert!(NotificationStatus::Partial.is_terminal());
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in NotificationStatus::ALL {
            assert_eq!(
                NotificationStatus::from_str(&status.to_string()).unwrap(),
                status
            );
        }
        assert!(NotificationStatus::from_str("delivered").is_err());
    }

    #[test]
    fn test_channel_type_case_insensitive() {
        assert_eq!(ChannelType::from_str("email").unwrap(), ChannelType::Email);
        assert_eq!(ChannelType::from_str("EMAIL").unwrap(), ChannelType::Email);
        assert_eq!(
            ChannelType::from_str("Telegram").unwrap(),
            ChannelType::Telegram
        );
        assert!(ChannelType::from_str("sms").is_err());
        assert!(ChannelType::from_str("").is_err());
    }

    #[test]
    fn test_request_wire_format() {
        let request = NotificationRequest {
            id: "msg_1".to_string(),
            recipient: "user-42".to_string(),
            message: "hello".to_string(),
            channels: vec!["email".to_string(), "telegram".to_string()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["user_id"], "user-42");
        assert_eq!(json["channels"][1], "telegram");

        let parsed: NotificationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_new_notification_id_format() {
        let id = new_notification_id();
        assert!(id.starts_with("msg_"));
        assert_eq!(id.len(), 4 + 32);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_notification_id());
    }
}
