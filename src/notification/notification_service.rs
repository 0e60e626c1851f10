use std::sync::Arc;
use uuid::Uuid;

use super::{
    deadline_scheduler::{DeadlineScanJob, ScanReport},
    notification_dto::{BroadcastRequest, BroadcastResponse, CreateNotificationRequest},
    notification_models::{NewNotification, Notification, NotificationType},
    notification_repository::NotificationRepository,
    notifier::Notifier,
    push::{ExpoPushSender, PushMessage},
};
use crate::{
    dto::{Page, PaginatedResponse},
    error::{AppError, Result},
    user::user_repository::UserRepository,
};

#[derive(Clone)]
pub struct NotificationService {
    notification_repository: NotificationRepository,
    user_repository: UserRepository,
    notifier: Notifier,
    expo: ExpoPushSender,
    deadline_job: Arc<DeadlineScanJob>,
}

impl NotificationService {
    pub fn new(
        notification_repository: NotificationRepository,
        user_repository: UserRepository,
        notifier: Notifier,
        expo: ExpoPushSender,
        deadline_job: Arc<DeadlineScanJob>,
    ) -> Self {
        Self {
            notification_repository,
            user_repository,
            notifier,
            expo,
            deadline_job,
        }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        is_read: Option<bool>,
        page: Page,
    ) -> Result<PaginatedResponse<Notification>> {
        let notifications = self
            .notification_repository
            .find_by_user(user_id, is_read, page.limit as i64, page.offset())
            .await?;
        let total = self
            .notification_repository
            .count_by_user(user_id, is_read)
            .await?;

        Ok(PaginatedResponse::new(notifications, total, page))
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        self.notification_repository
            .count_by_user(user_id, Some(false))
            .await
    }

    pub async fn mark_as_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification> {
        self.notification_repository
            .mark_as_read(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    pub async fn mark_all_as_read(&self, user_id: Uuid) -> Result<u64> {
        self.notification_repository.mark_all_as_read(user_id).await
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<()> {
        let rows_affected = self.notification_repository.delete(id, user_id).await?;
        if rows_affected == 0 {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }

        Ok(())
    }

    pub async fn create(&self, payload: CreateNotificationRequest) -> Result<Notification> {
        let new = NewNotification {
            user_id: payload.user_id,
            case_id: payload.case_id,
            notification_type: payload.notification_type.unwrap_or(NotificationType::System),
            title: payload.title,
            body: payload.body,
        };

        self.notifier
            .notify(new)
            .await
            .map_err(|e| e.on_constraint("Case not found"))?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Push-only announcement to every device with an Expo token. Nothing is
    /// stored in the notification history.
    pub async fn broadcast(&self, payload: BroadcastRequest) -> Result<BroadcastResponse> {
        let tokens = self.user_repository.find_expo_tokens().await?;
        let message = PushMessage {
            title: payload.title,
            body: payload.body,
            data: None,
        };

        let accepted = self.expo.send_many(&tokens, &message).await;
        tracing::info!("Broadcast accepted for {}/{} devices", accepted, tokens.len());

        Ok(BroadcastResponse {
            recipients: tokens.len(),
            accepted,
        })
    }

    pub async fn run_deadline_check(&self) -> Result<ScanReport> {
        self.deadline_job.run(chrono::Utc::now()).await
    }
}
