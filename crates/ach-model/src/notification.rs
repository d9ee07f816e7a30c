//! Side-channel notifications

use crate::ids::{NotificationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Outgoing notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient: UserId,
    pub title: String,
    pub message: String,
}

impl NewNotification {
    #[must_use]
    pub fn new(recipient: UserId, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Materialize as unread
    #[must_use]
    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::new(),
            recipient: self.recipient,
            title: self.title,
            message: self.message,
            is_read: false,
            created_at: now,
        }
    }
}
