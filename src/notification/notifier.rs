use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    notification_models::{NewNotification, Notification},
    push::{PushMessage, PushRecipient, PushSender},
};
use crate::error::Result;

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Most recent notification for a (case, user) pair, of any type.
    async fn find_latest(&self, case_id: Uuid, user_id: Uuid) -> Result<Option<Notification>>;

    async fn insert(&self, new: &NewNotification) -> Result<Notification>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_recipient(&self, user_id: Uuid) -> Result<Option<PushRecipient>>;
}

/// Persists a notification, fans it out to live SSE subscribers and hands
/// it to the push channels.
#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn NotificationStore>,
    users: Arc<dyn UserDirectory>,
    push: Arc<dyn PushSender>,
    events: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        users: Arc<dyn UserDirectory>,
        push: Arc<dyn PushSender>,
        events: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            store,
            users,
            push,
            events,
        }
    }

    pub async fn last_sent_at(&self, case_id: Uuid, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let latest = self.store.find_latest(case_id, user_id).await?;
        Ok(latest.map(|n| n.created_at))
    }

    /// Returns `None` without writing anything when the user does not exist.
    /// Push delivery runs in the background and never fails the call.
    pub async fn notify(&self, new: NewNotification) -> Result<Option<Notification>> {
        let Some(recipient) = self.users.find_recipient(new.user_id).await? else {
            warn!("Notification skipped, user {} not found", new.user_id);
            return Ok(None);
        };

        let notification = self.store.insert(&new).await?;

        if self.events.send(notification.clone()).is_err() {
            debug!("No live subscribers for notification {}", notification.id);
        }

        let message = PushMessage {
            title: notification.title.clone(),
            body: notification.body.clone(),
            data: Some(json!({
                "notificationId": notification.id,
                "caseId": notification.case_id,
                "type": notification.notification_type,
            })),
        };
        let push = self.push.clone();
        tokio::spawn(async move {
            if let Err(e) = push.send(&recipient, &message).await {
                warn!("Push delivery failed for user {}: {}", recipient.user_id, e);
            }
        });

        Ok(Some(notification))
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use crate::notification::push::{PushError, PushOutcome};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryStore {
        pub rows: Mutex<Vec<Notification>>,
    }

    impl InMemoryStore {
        pub fn seed(&self, case_id: Uuid, user_id: Uuid, created_at: DateTime<Utc>) {
            self.rows.lock().unwrap().push(Notification {
                id: Uuid::new_v4(),
                user_id,
                case_id: Some(case_id),
                notification_type: "CASE_DEADLINE_SOON".to_string(),
                title: "seed".to_string(),
                body: "seed".to_string(),
                is_read: false,
                created_at,
            });
        }

        pub fn count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationStore for InMemoryStore {
        async fn find_latest(&self, case_id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|n| n.case_id == Some(case_id) && n.user_id == user_id)
                .max_by_key(|n| n.created_at)
                .cloned())
        }

        async fn insert(&self, new: &NewNotification) -> Result<Notification> {
            let row = Notification {
                id: Uuid::new_v4(),
                user_id: new.user_id,
                case_id: new.case_id,
                notification_type: new.notification_type.to_string(),
                title: new.title.clone(),
                body: new.body.clone(),
                is_read: false,
                created_at: Utc::now(),
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }
    }

    #[derive(Default)]
    pub struct InMemoryUsers {
        pub known: Vec<Uuid>,
    }

    #[async_trait]
    impl UserDirectory for InMemoryUsers {
        async fn find_recipient(&self, user_id: Uuid) -> Result<Option<PushRecipient>> {
            Ok(self.known.contains(&user_id).then(|| PushRecipient {
                user_id,
                token_expo: Some("ExponentPushToken[test]".to_string()),
                fcm_token: None,
            }))
        }
    }

    pub struct NoopPush;

    #[async_trait]
    impl PushSender for NoopPush {
        fn channel(&self) -> &'static str {
            "noop"
        }

        async fn send(&self, _: &PushRecipient, _: &PushMessage) -> std::result::Result<PushOutcome, PushError> {
            Ok(PushOutcome::Delivered)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use crate::notification::{
        notification_models::NotificationType,
        push::{MockPushSender, PushOutcome},
    };

    fn new_notification(user_id: Uuid) -> NewNotification {
        NewNotification {
            user_id,
            case_id: Some(Uuid::new_v4()),
            notification_type: NotificationType::CaseOverdue,
            title: "Overdue".to_string(),
            body: "Case is overdue".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_recipient_writes_nothing() {
        let store = Arc::new(InMemoryStore::default());
        let (tx, _rx) = broadcast::channel(8);
        let mut push = MockPushSender::new();
        push.expect_send().never();

        let notifier = Notifier::new(
            store.clone(),
            Arc::new(InMemoryUsers::default()),
            Arc::new(push),
            tx,
        );

        let result = notifier.notify(new_notification(Uuid::new_v4())).await.unwrap();
        assert!(result.is_none());
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_notify_persists_broadcasts_and_pushes() {
        let user_id = Uuid::new_v4();
        let store = Arc::new(InMemoryStore::default());
        let (tx, mut rx) = broadcast::channel(8);
        let (pushed_tx, mut pushed_rx) = tokio::sync::mpsc::unbounded_channel();

        let mut push = MockPushSender::new();
        push.expect_send().times(1).returning(move |recipient, message| {
            let _ = pushed_tx.send((recipient.user_id, message.title.clone()));
            Ok(PushOutcome::Delivered)
        });

        let notifier = Notifier::new(
            store.clone(),
            Arc::new(InMemoryUsers { known: vec![user_id] }),
            Arc::new(push),
            tx,
        );

        let saved = notifier.notify(new_notification(user_id)).await.unwrap().unwrap();
        assert_eq!(saved.notification_type, "CASE_OVERDUE");
        assert_eq!(store.count(), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.id, saved.id);

        let (pushed_user, pushed_title) = pushed_rx.recv().await.unwrap();
        assert_eq!(pushed_user, user_id);
        assert_eq!(pushed_title, "Overdue");

        let last = notifier
            .last_sent_at(saved.case_id.unwrap(), user_id)
            .await
            .unwrap();
        assert_eq!(last, Some(saved.created_at));
    }
}
