use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TemplateFieldInput {
    /// Present when updating an existing field.
    pub id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub field_label: Option<String>,
    #[validate(length(max = 100))]
    pub field_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub field_type: String,
    pub is_required: Option<bool>,
    #[validate(length(max = 255))]
    pub placeholder: Option<String>,
    pub options: Option<Vec<String>>,
    #[validate(length(max = 255))]
    pub default_value: Option<String>,
    pub is_editable: Option<bool>,
    pub index: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TemplateGroupInput {
    /// Present when updating an existing group.
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    pub description: Option<String>,
    pub is_editable: Option<bool>,
    pub index: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub fields: Vec<TemplateFieldInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub groups: Vec<TemplateGroupInput>,
}

/// Omitted `groups` leaves the structure alone; a given list replaces it.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTemplateRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(nested)]
    pub groups: Option<Vec<TemplateGroupInput>>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub q: Option<String>,
}
