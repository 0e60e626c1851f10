use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    notification_models::{NewNotification, Notification},
    notifier::NotificationStore,
};
use crate::error::Result;

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(
        &self,
        user_id: Uuid,
        is_read: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications
             WHERE user_id = $1 AND ($2::boolean IS NULL OR is_read = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4"
        )
        .bind(user_id)
        .bind(is_read)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn count_by_user(&self, user_id: Uuid, is_read: Option<bool>) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications
             WHERE user_id = $1 AND ($2::boolean IS NULL OR is_read = $2)"
        )
        .bind(user_id)
        .bind(is_read)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    pub async fn mark_as_read(&self, id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2 RETURNING *"
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    pub async fn mark_all_as_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false"
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn create(&self, new: &NewNotification) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (user_id, case_id, type, title, body)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *"
        )
        .bind(new.user_id)
        .bind(new.case_id)
        .bind(new.notification_type.as_str())
        .bind(&new.title)
        .bind(&new.body)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    pub async fn find_latest_for_case(&self, case_id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications
             WHERE case_id = $1 AND user_id = $2
             ORDER BY created_at DESC
             LIMIT 1"
        )
        .bind(case_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn find_latest(&self, case_id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
        self.find_latest_for_case(case_id, user_id).await
    }

    async fn insert(&self, new: &NewNotification) -> Result<Notification> {
        self.create(new).await
    }
}
