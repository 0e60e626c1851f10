use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::notification_models::NotificationType;

#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub is_read: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    pub case_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub body: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BroadcastRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub body: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BroadcastResponse {
    pub recipients: usize,
    pub accepted: usize,
}
