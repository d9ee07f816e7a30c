use crate::traits::NotificationSink;
use crate::StoreResult;
use ach_model::{NewNotification, Notification, UserId};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

/// Notification sink that keeps everything it is sent.
#[derive(Debug, Default)]
pub struct InMemoryNotificationSink {
    sent: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn send(&self, notification: NewNotification) -> StoreResult<()> {
        tracing::trace!(recipient = %notification.recipient, title = %notification.title, "notification queued");
        self.sent
            .lock()
            .push(notification.into_notification(Utc::now()));
        Ok(())
    }

    async fn list_for_recipient(&self, recipient: UserId) -> StoreResult<Vec<Notification>> {
        let sent = self.sent.lock();
        // newest first; ties resolved by reverse send order
        Ok(sent
            .iter()
            .rev()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recipients_see_only_their_notifications() {
        let sink = InMemoryNotificationSink::new();
        let lecturer = UserId::new();
        let student = UserId::new();

        sink.send(NewNotification::new(lecturer, "first", "a"))
            .await
            .unwrap();
        sink.send(NewNotification::new(student, "other", "b"))
            .await
            .unwrap();
        sink.send(NewNotification::new(lecturer, "second", "c"))
            .await
            .unwrap();

        let inbox = sink.list_for_recipient(lecturer).await.unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].title, "second");
        assert!(inbox.iter().all(|n| !n.is_read));
        assert_eq!(sink.len(), 3);
    }
}
