use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::{
    template_dto::{CreateTemplateRequest, TemplateListParams, UpdateTemplateRequest},
    template_models::TemplateDetail,
};
use crate::{dto::Page, error::Result, state::AppState};

/// List templates
#[utoipa::path(
    get,
    path = "/api/templates",
    tag = "templates",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("limit" = Option<u32>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Search by title or description")
    ),
    responses(
        (status = 200, description = "Templates retrieved successfully"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<TemplateListParams>,
) -> Result<impl IntoResponse> {
    let page = Page::new(params.page, params.limit);
    let response = state
        .template_service
        .list_templates(params.q.as_deref(), page)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

/// Get a template with its groups and fields
#[utoipa::path(
    get,
    path = "/api/templates/{id}",
    tag = "templates",
    params(("id" = Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template retrieved successfully", body = TemplateDetail),
        (status = 404, description = "Template not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let template = state.template_service.get_template(id).await?;

    Ok((StatusCode::OK, Json(template)))
}

/// Create a template (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/templates",
    tag = "admin",
    request_body = CreateTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = TemplateDetail),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Template title already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let template = state.template_service.create_template(payload).await?;

    Ok((StatusCode::CREATED, Json(template)))
}

/// Update a template and sync its groups and fields (admin only)
#[utoipa::path(
    put,
    path = "/api/admin/templates/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Template ID")),
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Template updated", body = TemplateDetail),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Template not found"),
        (status = 409, description = "Template title already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTemplateRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let template = state.template_service.update_template(id, payload).await?;

    Ok((StatusCode::OK, Json(template)))
}

/// Delete a template (admin only)
#[utoipa::path(
    delete,
    path = "/api/admin/templates/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Template ID")),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Template not found"),
        (status = 409, description = "Template is used by existing cases or sources")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.template_service.delete_template(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
