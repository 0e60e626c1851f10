use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{template::template_models::Template, user::user_models::UserResponse};

/// Cases and sources (tip-offs still being verified) share one schema shape
/// under separate tables. Child tables key on `case_id` or `source_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Case,
    Source,
}

impl RecordKind {
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Case => "Case",
            RecordKind::Source => "Source",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Case => "cases",
            RecordKind::Source => "sources",
        }
    }

    pub fn owner_column(&self) -> &'static str {
        match self {
            RecordKind::Case => "case_id",
            RecordKind::Source => "source_id",
        }
    }

    pub fn groups_table(&self) -> &'static str {
        match self {
            RecordKind::Case => "case_groups",
            RecordKind::Source => "source_groups",
        }
    }

    pub fn fields_table(&self) -> &'static str {
        match self {
            RecordKind::Case => "case_fields",
            RecordKind::Source => "source_fields",
        }
    }

    pub fn phases_table(&self) -> &'static str {
        match self {
            RecordKind::Case => "case_phases",
            RecordKind::Source => "source_phases",
        }
    }

    pub fn plans_table(&self) -> &'static str {
        match self {
            RecordKind::Case => "case_plans",
            RecordKind::Source => "source_plans",
        }
    }

    /// Child rows are read back with the owner key aliased to `case_id`.
    pub fn group_columns(&self) -> String {
        format!(
            "id, {} AS case_id, group_id, title, description, index, created_at",
            self.owner_column()
        )
    }

    pub fn field_columns(&self) -> String {
        format!(
            "id, {} AS case_id, group_id, field_label, field_name, field_type, field_value,
             is_required, placeholder, options, default_value, is_editable, index, description,
             created_at",
            self.owner_column()
        )
    }

    pub fn phase_columns(&self) -> String {
        format!(
            "id, {} AS case_id, name, description, \"order\", start_date, end_date, is_completed,
             completed_at, tasks, note, created_at, updated_at",
            self.owner_column()
        )
    }

    pub fn plan_columns(&self) -> String {
        format!(
            "id, {} AS case_id, investigation_result, exhibits, next_investigation_purpose,
             next_investigation_content, participating_forces, created_at, updated_at",
            self.owner_column()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Pending,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 5] = [
        CaseStatus::Pending,
        CaseStatus::InProgress,
        CaseStatus::Completed,
        CaseStatus::OnHold,
        CaseStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "PENDING",
            CaseStatus::InProgress => "IN_PROGRESS",
            CaseStatus::Completed => "COMPLETED",
            CaseStatus::OnHold => "ON_HOLD",
            CaseStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CaseStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown case status: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Case {
    pub id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub crime_type: Option<String>,
    pub applicable_law: Option<String>,
    pub number_of_defendants: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List row with the case window derived from its phases.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CaseListItem {
    pub id: Uuid,
    pub template_id: Uuid,
    pub template_title: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub crime_type: Option<String>,
    pub applicable_law: Option<String>,
    pub number_of_defendants: Option<String>,
    pub user_id: Option<Uuid>,
    pub assignee_name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CaseGroup {
    pub id: Uuid,
    pub case_id: Uuid,
    /// Template group this group was cloned from.
    pub group_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub index: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CaseField {
    pub id: Uuid,
    pub case_id: Uuid,
    pub group_id: Uuid,
    pub field_label: String,
    pub field_name: String,
    pub field_type: String,
    pub field_value: Option<String>,
    pub is_required: bool,
    pub placeholder: Option<String>,
    #[schema(value_type = Vec<String>)]
    pub options: Json<Vec<String>>,
    pub default_value: Option<String>,
    pub is_editable: bool,
    pub index: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A case field resolved against its template, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCaseField {
    pub group_id: Uuid,
    pub field_label: String,
    pub field_name: String,
    pub field_type: String,
    pub field_value: Option<String>,
    pub is_required: bool,
    pub placeholder: Option<String>,
    pub options: Vec<String>,
    pub default_value: Option<String>,
    pub is_editable: bool,
    pub index: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CasePhase {
    pub id: Uuid,
    pub case_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub order: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    #[schema(value_type = Vec<String>)]
    pub tasks: Json<Vec<String>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CasePhase {
    /// Completion date when finished, planned end otherwise.
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.completed_at.or(self.end_date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CasePlan {
    pub id: Uuid,
    pub case_id: Uuid,
    pub investigation_result: Option<String>,
    #[schema(value_type = Vec<String>)]
    pub exhibits: Json<Vec<String>>,
    pub next_investigation_purpose: Option<String>,
    #[schema(value_type = Vec<String>)]
    pub next_investigation_content: Json<Vec<String>>,
    #[schema(value_type = Vec<String>)]
    pub participating_forces: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CaseGroupDetail {
    pub id: Uuid,
    pub group_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub index: i32,
    pub fields: Vec<CaseField>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CaseDetail {
    pub case: Case,
    pub template: Option<Template>,
    pub assignee: Option<UserResponse>,
    pub groups: Vec<CaseGroupDetail>,
    pub phases: Vec<CasePhase>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_parse() {
        assert_eq!("IN_PROGRESS".parse::<CaseStatus>().unwrap(), CaseStatus::InProgress);
        assert_eq!(
            serde_json::to_value(CaseStatus::OnHold).unwrap(),
            serde_json::json!("ON_HOLD")
        );
        assert!("in_progress".parse::<CaseStatus>().is_err());
    }

    #[test]
    fn test_record_kind_tables() {
        assert_eq!(RecordKind::Case.phases_table(), "case_phases");
        assert_eq!(RecordKind::Source.phases_table(), "source_phases");
        assert_eq!(RecordKind::Source.plans_table(), "source_plans");
        assert_eq!(RecordKind::Source.label(), "Source");

        let columns = RecordKind::Source.phase_columns();
        assert!(columns.starts_with("id, source_id AS case_id,"));
        assert!(RecordKind::Case.field_columns().contains("case_id AS case_id"));
        assert!(RecordKind::Source.plan_columns().contains("source_id AS case_id"));
    }

    #[test]
    fn test_effective_end_prefers_completion() {
        let now = Utc::now();
        let mut phase = CasePhase {
            id: Uuid::new_v4(),
            case_id: Uuid::new_v4(),
            name: "Điều tra".to_string(),
            description: None,
            order: 1,
            start_date: now,
            end_date: Some(now + Duration::days(10)),
            is_completed: false,
            completed_at: None,
            tasks: Json(vec![]),
            note: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(phase.effective_end(), phase.end_date);

        phase.completed_at = Some(now + Duration::days(2));
        assert_eq!(phase.effective_end(), Some(now + Duration::days(2)));
    }
}
