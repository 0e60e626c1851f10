use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::case_models::CaseStatus;
use crate::dto::SortOrder;

/// Value for one template field. Anything omitted is taken from the template.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CaseFieldInput {
    #[validate(length(min = 1, max = 100))]
    pub field_name: String,
    pub field_value: Option<String>,
    #[validate(length(max = 100))]
    pub field_label: Option<String>,
    #[validate(length(max = 50))]
    pub field_type: Option<String>,
    pub is_required: Option<bool>,
    pub placeholder: Option<String>,
    pub options: Option<Vec<String>>,
    pub default_value: Option<String>,
    pub is_editable: Option<bool>,
    pub index: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCaseRequest {
    pub template_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub status: Option<CaseStatus>,
    #[validate(length(max = 100))]
    pub crime_type: Option<String>,
    #[validate(length(max = 255))]
    pub applicable_law: Option<String>,
    #[validate(length(max = 50))]
    pub number_of_defendants: Option<String>,
    /// Assignee; defaults to the caller.
    pub user_id: Option<Uuid>,
    #[serde(default)]
    #[validate(nested)]
    pub fields: Vec<CaseFieldInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCaseFieldInput {
    pub id: Uuid,
    pub field_value: Option<String>,
    #[validate(length(max = 100))]
    pub field_label: Option<String>,
    pub index: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCaseGroupInput {
    pub id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub index: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub fields: Vec<UpdateCaseFieldInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCaseRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<CaseStatus>,
    #[validate(length(max = 100))]
    pub crime_type: Option<String>,
    #[validate(length(max = 255))]
    pub applicable_law: Option<String>,
    #[validate(length(max = 50))]
    pub number_of_defendants: Option<String>,
    pub user_id: Option<Uuid>,
    #[serde(default)]
    #[validate(nested)]
    pub groups: Vec<UpdateCaseGroupInput>,
}

#[derive(Debug, Deserialize)]
pub struct CaseListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub q: Option<String>,
    pub status: Option<CaseStatus>,
    pub user_id: Option<Uuid>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PhaseTaskInput {
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePhaseRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    /// Appended after the last phase when omitted.
    pub order: Option<i32>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tasks: Vec<PhaseTaskInput>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePhaseRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub order: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_completed: Option<bool>,
    pub tasks: Option<Vec<PhaseTaskInput>>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpsertPlanRequest {
    pub investigation_result: Option<String>,
    pub exhibits: Option<Vec<String>>,
    pub next_investigation_purpose: Option<String>,
    pub next_investigation_content: Option<Vec<String>>,
    pub participating_forces: Option<Vec<String>>,
}

/// Task names, trimmed, blanks dropped.
pub fn task_names(tasks: &[PhaseTaskInput]) -> Vec<String> {
    tasks
        .iter()
        .map(|t| t.name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
