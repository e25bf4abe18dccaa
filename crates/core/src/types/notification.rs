//! Notifications pushed over the real-time channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NotificationId, UserId};

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Order placed, accepted, or status changed.
    Order,
    /// Delivery assignment or progress.
    Delivery,
    /// Direct message from another user.
    Message,
    /// Anything else.
    #[default]
    #[serde(other)]
    System,
}

/// A `newNotification` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification identifier.
    #[serde(alias = "_id")]
    pub id: NotificationId,
    /// Recipient.
    #[serde(alias = "recipient")]
    pub user_id: UserId,
    /// Short headline.
    #[serde(default)]
    pub title: String,
    /// Body text.
    pub message: String,
    /// Category.
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: NotificationKind,
    /// Whether the recipient has seen it.
    #[serde(default)]
    pub read: bool,
    /// When the backend created it.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_socket_payload() {
        let n: Notification = serde_json::from_value(json!({
            "_id": "n1",
            "recipient": "u1",
            "message": "Your order is on its way",
            "type": "delivery",
            "createdAt": "2026-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(n.id.as_str(), "n1");
        assert_eq!(n.user_id.as_str(), "u1");
        assert_eq!(n.kind, NotificationKind::Delivery);
        assert!(!n.read);
    }

    #[test]
    fn test_unknown_kind_falls_back_to_system() {
        let kind: NotificationKind = serde_json::from_value(json!("promotion")).unwrap();
        assert_eq!(kind, NotificationKind::System);
    }
}
