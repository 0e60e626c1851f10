use sqlx::{Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use super::{
    template_dto::{CreateTemplateRequest, TemplateGroupInput, UpdateTemplateRequest},
    template_models::{Template, TemplateDetail},
    template_repository::TemplateRepository,
};
use crate::{
    db::DbPool,
    dto::{Page, PaginatedResponse},
    error::{AppError, Result},
};

#[derive(Clone)]
pub struct TemplateService {
    db: DbPool,
    repo: TemplateRepository,
}

impl TemplateService {
    pub fn new(db: DbPool, repo: TemplateRepository) -> Self {
        Self { db, repo }
    }

    pub async fn create_template(&self, payload: CreateTemplateRequest) -> Result<TemplateDetail> {
        let mut tx = self.db.begin().await?;

        let template = self
            .repo
            .create_with_tx(&mut tx, payload.title.trim(), payload.description.as_deref())
            .await
            .map_err(|e| e.on_constraint("Template title already exists"))?;

        for (position, group) in payload.groups.iter().enumerate() {
            let created = self
                .repo
                .insert_group_with_tx(&mut tx, template.id, group, position as i32)
                .await?;
            for (field_position, field) in group.fields.iter().enumerate() {
                self.repo
                    .insert_field_with_tx(&mut tx, created.id, field, field_position as i32)
                    .await?;
            }
        }

        tx.commit().await?;

        info!(template_id = %template.id, "Template created");
        self.get_template(template.id).await
    }

    pub async fn list_templates(&self, q: Option<&str>, page: Page) -> Result<PaginatedResponse<Template>> {
        let q = q.filter(|q| !q.trim().is_empty());
        let templates = self
            .repo
            .find_all(q, page.limit as i64, page.offset())
            .await?;
        let total = self.repo.count_all(q).await?;

        Ok(PaginatedResponse::new(templates, total, page))
    }

    pub async fn find_template(&self, id: Uuid) -> Result<Option<Template>> {
        self.repo.find_by_id(id).await
    }

    pub async fn get_template(&self, id: Uuid) -> Result<TemplateDetail> {
        let template = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;
        let groups = self.repo.find_groups(id).await?;
        let fields = self.repo.find_fields(id).await?;

        Ok(TemplateDetail::assemble(template, groups, fields))
    }

    pub async fn update_template(
        &self,
        id: Uuid,
        payload: UpdateTemplateRequest,
    ) -> Result<TemplateDetail> {
        let mut tx = self.db.begin().await?;

        self.repo
            .update_with_tx(
                &mut tx,
                id,
                payload.title.as_deref().map(str::trim),
                payload.description.as_deref(),
            )
            .await
            .map_err(|e| e.on_constraint("Template title already exists"))?
            .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;

        if let Some(groups) = &payload.groups {
            self.sync_groups(&mut tx, id, groups).await?;
        }

        tx.commit().await?;

        info!(template_id = %id, "Template updated");
        self.get_template(id).await
    }

    /// Makes the stored groups and fields match `groups`: entries with an id
    /// are updated, entries without one are inserted, anything not listed is
    /// removed.
    async fn sync_groups(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        template_id: Uuid,
        groups: &[TemplateGroupInput],
    ) -> Result<()> {
        let mut kept_groups = Vec::with_capacity(groups.len());

        for (position, input) in groups.iter().enumerate() {
            let group = match input.id {
                Some(group_id) => self
                    .repo
                    .update_group_with_tx(tx, template_id, group_id, input)
                    .await?
                    .ok_or_else(|| {
                        AppError::BadRequest(format!("Group {} does not belong to this template", group_id))
                    })?,
                None => {
                    self.repo
                        .insert_group_with_tx(tx, template_id, input, position as i32)
                        .await?
                }
            };

            let mut kept_fields = Vec::with_capacity(input.fields.len());
            for (field_position, field) in input.fields.iter().enumerate() {
                let saved = match field.id {
                    Some(field_id) => self
                        .repo
                        .update_field_with_tx(tx, group.id, field_id, field)
                        .await?
                        .ok_or_else(|| {
                            AppError::BadRequest(format!("Field {} does not belong to group {}", field_id, group.id))
                        })?,
                    None => {
                        self.repo
                            .insert_field_with_tx(tx, group.id, field, field_position as i32)
                            .await?
                    }
                };
                kept_fields.push(saved.id);
            }

            self.repo
                .delete_other_fields_with_tx(tx, group.id, &kept_fields)
                .await?;
            kept_groups.push(group.id);
        }

        self.repo
            .delete_other_groups_with_tx(tx, template_id, &kept_groups)
            .await?;

        Ok(())
    }

    pub async fn delete_template(&self, id: Uuid) -> Result<()> {
        if self.repo.is_in_use(id).await? {
            return Err(AppError::Conflict(
                "Template is used by existing cases or sources".to_string(),
            ));
        }

        let rows_affected = self
            .repo
            .delete(id)
            .await
            .map_err(|e| e.on_constraint("Template is used by existing cases or sources"))?;
        if rows_affected == 0 {
            return Err(AppError::NotFound("Template not found".to_string()));
        }

        info!(template_id = %id, "Template deleted");
        Ok(())
    }
}
