use sqlx::{types::Json, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    template_dto::{TemplateFieldInput, TemplateGroupInput},
    template_models::{Template, TemplateField, TemplateGroup},
};
use crate::{dto::like_pattern, error::Result};

#[derive(Clone)]
pub struct TemplateRepository {
    pool: PgPool,
}

impl TemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        title: &str,
        description: Option<&str>,
    ) -> Result<Template> {
        let template = sqlx::query_as::<_, Template>(
            "INSERT INTO templates (title, description) VALUES ($1, $2) RETURNING *"
        )
        .bind(title)
        .bind(description)
        .fetch_one(&mut **tx)
        .await?;

        Ok(template)
    }

    pub async fn update_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Template>> {
        let template = sqlx::query_as::<_, Template>(
            "UPDATE templates SET
                title = COALESCE($2, title),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING *"
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(template)
    }

    pub async fn insert_group_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        template_id: Uuid,
        group: &TemplateGroupInput,
        position: i32,
    ) -> Result<TemplateGroup> {
        let group = sqlx::query_as::<_, TemplateGroup>(
            "INSERT INTO template_groups (template_id, title, description, is_editable, index)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *"
        )
        .bind(template_id)
        .bind(&group.title)
        .bind(&group.description)
        .bind(group.is_editable.unwrap_or(true))
        .bind(group.index.unwrap_or(position))
        .fetch_one(&mut **tx)
        .await?;

        Ok(group)
    }

    pub async fn update_group_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        template_id: Uuid,
        group_id: Uuid,
        group: &TemplateGroupInput,
    ) -> Result<Option<TemplateGroup>> {
        let group = sqlx::query_as::<_, TemplateGroup>(
            "UPDATE template_groups SET
                title = $3,
                description = COALESCE($4, description),
                is_editable = COALESCE($5, is_editable),
                index = COALESCE($6, index)
             WHERE id = $1 AND template_id = $2
             RETURNING *"
        )
        .bind(group_id)
        .bind(template_id)
        .bind(&group.title)
        .bind(&group.description)
        .bind(group.is_editable)
        .bind(group.index)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(group)
    }

    pub async fn insert_field_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        field: &TemplateFieldInput,
        position: i32,
    ) -> Result<TemplateField> {
        let field = sqlx::query_as::<_, TemplateField>(
            "INSERT INTO template_fields
                (group_id, field_label, field_name, field_type, is_required, placeholder,
                 options, default_value, is_editable, index, description)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *"
        )
        .bind(group_id)
        .bind(&field.field_label)
        .bind(&field.field_name)
        .bind(&field.field_type)
        .bind(field.is_required.unwrap_or(false))
        .bind(&field.placeholder)
        .bind(Json(field.options.clone().unwrap_or_default()))
        .bind(&field.default_value)
        .bind(field.is_editable.unwrap_or(true))
        .bind(field.index.unwrap_or(position))
        .bind(&field.description)
        .fetch_one(&mut **tx)
        .await?;

        Ok(field)
    }

    pub async fn update_field_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        field_id: Uuid,
        field: &TemplateFieldInput,
    ) -> Result<Option<TemplateField>> {
        let field = sqlx::query_as::<_, TemplateField>(
            "UPDATE template_fields SET
                field_label = COALESCE($3, field_label),
                field_name = COALESCE($4, field_name),
                field_type = $5,
                is_required = COALESCE($6, is_required),
                placeholder = COALESCE($7, placeholder),
                options = COALESCE($8, options),
                default_value = COALESCE($9, default_value),
                is_editable = COALESCE($10, is_editable),
                index = COALESCE($11, index),
                description = COALESCE($12, description)
             WHERE id = $1 AND group_id = $2
             RETURNING *"
        )
        .bind(field_id)
        .bind(group_id)
        .bind(&field.field_label)
        .bind(&field.field_name)
        .bind(&field.field_type)
        .bind(field.is_required)
        .bind(&field.placeholder)
        .bind(field.options.clone().map(Json))
        .bind(&field.default_value)
        .bind(field.is_editable)
        .bind(field.index)
        .bind(&field.description)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(field)
    }

    /// Removes the template's groups whose id is not in `keep`.
    pub async fn delete_other_groups_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        template_id: Uuid,
        keep: &[Uuid],
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM template_groups WHERE template_id = $1 AND NOT (id = ANY($2))"
        )
        .bind(template_id)
        .bind(keep)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_other_fields_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        keep: &[Uuid],
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM template_fields WHERE group_id = $1 AND NOT (id = ANY($2))"
        )
        .bind(group_id)
        .bind(keep)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_all(&self, q: Option<&str>, limit: i64, offset: i64) -> Result<Vec<Template>> {
        let pattern = q.map(like_pattern);
        let templates = sqlx::query_as::<_, Template>(
            "SELECT * FROM templates
             WHERE ($1::text IS NULL OR title ILIKE $1 OR description ILIKE $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        )
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(templates)
    }

    pub async fn count_all(&self, q: Option<&str>) -> Result<i64> {
        let pattern = q.map(like_pattern);
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM templates
             WHERE ($1::text IS NULL OR title ILIKE $1 OR description ILIKE $1)"
        )
        .bind(pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Template>> {
        let template = sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(template)
    }

    pub async fn find_groups(&self, template_id: Uuid) -> Result<Vec<TemplateGroup>> {
        let groups = sqlx::query_as::<_, TemplateGroup>(
            "SELECT * FROM template_groups WHERE template_id = $1 ORDER BY index ASC"
        )
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    pub async fn find_fields(&self, template_id: Uuid) -> Result<Vec<TemplateField>> {
        let fields = sqlx::query_as::<_, TemplateField>(
            "SELECT f.* FROM template_fields f
             JOIN template_groups g ON g.id = f.group_id
             WHERE g.template_id = $1
             ORDER BY f.index ASC"
        )
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fields)
    }

    pub async fn is_in_use(&self, id: Uuid) -> Result<bool> {
        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM cases WHERE template_id = $1)
                 OR EXISTS(SELECT 1 FROM sources WHERE template_id = $1)"
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(in_use)
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
