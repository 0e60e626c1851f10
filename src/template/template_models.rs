use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Template {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TemplateGroup {
    pub id: Uuid,
    pub template_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_editable: bool,
    pub index: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TemplateField {
    pub id: Uuid,
    pub group_id: Uuid,
    pub field_label: Option<String>,
    pub field_name: Option<String>,
    pub field_type: String,
    pub is_required: bool,
    pub placeholder: Option<String>,
    #[schema(value_type = Vec<String>)]
    pub options: Json<Vec<String>>,
    pub default_value: Option<String>,
    pub is_editable: bool,
    pub index: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TemplateGroupDetail {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_editable: bool,
    pub index: i32,
    pub fields: Vec<TemplateField>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TemplateDetail {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub groups: Vec<TemplateGroupDetail>,
}

impl TemplateDetail {
    /// Nests fields under their groups, both ordered by `index`.
    pub fn assemble(
        template: Template,
        mut groups: Vec<TemplateGroup>,
        fields: Vec<TemplateField>,
    ) -> Self {
        let mut by_group: HashMap<Uuid, Vec<TemplateField>> = HashMap::new();
        for field in fields {
            by_group.entry(field.group_id).or_default().push(field);
        }

        groups.sort_by_key(|g| g.index);
        let groups = groups
            .into_iter()
            .map(|group| {
                let mut fields = by_group.remove(&group.id).unwrap_or_default();
                fields.sort_by_key(|f| f.index);
                TemplateGroupDetail {
                    id: group.id,
                    title: group.title,
                    description: group.description,
                    is_editable: group.is_editable,
                    index: group.index,
                    fields,
                }
            })
            .collect();

        Self {
            id: template.id,
            title: template.title,
            description: template.description,
            created_at: template.created_at,
            groups,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &TemplateField> {
        self.groups.iter().flat_map(|g| g.fields.iter())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn group(template_id: Uuid, title: &str, index: i32) -> TemplateGroup {
        TemplateGroup {
            id: Uuid::new_v4(),
            template_id,
            title: title.to_string(),
            description: None,
            is_editable: true,
            index,
            created_at: Utc::now(),
        }
    }

    pub fn field(group_id: Uuid, name: &str, index: i32) -> TemplateField {
        TemplateField {
            id: Uuid::new_v4(),
            group_id,
            field_label: Some(format!("Label {}", name)),
            field_name: Some(name.to_string()),
            field_type: "select".to_string(),
            is_required: true,
            placeholder: Some("...".to_string()),
            options: Json(vec!["a".to_string(), "b".to_string()]),
            default_value: Some("a".to_string()),
            is_editable: false,
            index,
            description: None,
        }
    }

    pub fn template() -> Template {
        Template {
            id: Uuid::new_v4(),
            title: "Hình sự".to_string(),
            description: None,
            created_at: Utc::now(),
        }
    }
}
