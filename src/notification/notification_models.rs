use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    CaseDeadlineSoon,
    CaseOverdue,
    CaseAssigned,
    CaseStatusChanged,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::CaseDeadlineSoon => "CASE_DEADLINE_SOON",
            NotificationType::CaseOverdue => "CASE_OVERDUE",
            NotificationType::CaseAssigned => "CASE_ASSIGNED",
            NotificationType::CaseStatusChanged => "CASE_STATUS_CHANGED",
            NotificationType::System => "SYSTEM",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASE_DEADLINE_SOON" => Ok(NotificationType::CaseDeadlineSoon),
            "CASE_OVERDUE" => Ok(NotificationType::CaseOverdue),
            "CASE_ASSIGNED" => Ok(NotificationType::CaseAssigned),
            "CASE_STATUS_CHANGED" => Ok(NotificationType::CaseStatusChanged),
            "SYSTEM" => Ok(NotificationType::System),
            other => Err(format!("Unknown notification type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub case_id: Option<Uuid>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub case_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_round_trip() {
        for ty in [
            NotificationType::CaseDeadlineSoon,
            NotificationType::CaseOverdue,
            NotificationType::CaseAssigned,
            NotificationType::CaseStatusChanged,
            NotificationType::System,
        ] {
            assert_eq!(ty.as_str().parse::<NotificationType>().unwrap(), ty);
            assert_eq!(serde_json::to_value(ty).unwrap(), ty.as_str());
        }
        assert!("DEADLINE".parse::<NotificationType>().is_err());
    }
}
