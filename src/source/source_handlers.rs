use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    case::{
        case_dto::{
            CaseListParams, CreateCaseRequest, CreatePhaseRequest, UpdateCaseRequest,
            UpdatePhaseRequest, UpsertPlanRequest,
        },
        case_models::{CaseDetail, CasePhase, CasePlan},
    },
    error::Result,
    middleware::AuthUser,
    state::AppState,
};

/// Create a source from a template
#[utoipa::path(
    post,
    path = "/api/sources",
    tag = "sources",
    request_body = CreateCaseRequest,
    responses(
        (status = 201, description = "Source created", body = CaseDetail),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Template not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_source(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateCaseRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let source = state.source_service.create_case(&auth_user, payload).await?;

    Ok((StatusCode::CREATED, Json(source)))
}

/// List sources. Staff only see sources assigned to them.
#[utoipa::path(
    get,
    path = "/api/sources",
    tag = "sources",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("limit" = Option<u32>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Search name, description, crime type, applicable law"),
        ("status" = Option<String>, Query, description = "Source status"),
        ("user_id" = Option<Uuid>, Query, description = "Assignee (admin only)"),
        ("sort_order" = Option<String>, Query, description = "ASC or DESC by creation time")
    ),
    responses(
        (status = 200, description = "Paginated sources"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_sources(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<CaseListParams>,
) -> Result<impl IntoResponse> {
    let response = state.source_service.list_cases(&auth_user, params).await?;

    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/sources/{id}",
    tag = "sources",
    params(("id" = Uuid, Path, description = "Source ID")),
    responses(
        (status = 200, description = "Source with groups, fields and phases", body = CaseDetail),
        (status = 403, description = "Not your source"),
        (status = 404, description = "Source not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_source(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let source = state.source_service.get_case(&auth_user, id).await?;

    Ok((StatusCode::OK, Json(source)))
}

#[utoipa::path(
    put,
    path = "/api/sources/{id}",
    tag = "sources",
    params(("id" = Uuid, Path, description = "Source ID")),
    request_body = UpdateCaseRequest,
    responses(
        (status = 200, description = "Source updated", body = CaseDetail),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not your source"),
        (status = 404, description = "Source not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_source(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCaseRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let source = state.source_service.update_case(&auth_user, id, payload).await?;

    Ok((StatusCode::OK, Json(source)))
}

#[utoipa::path(
    delete,
    path = "/api/sources/{id}",
    tag = "sources",
    params(("id" = Uuid, Path, description = "Source ID")),
    responses(
        (status = 204, description = "Source deleted"),
        (status = 403, description = "Only the assignee or an admin can delete"),
        (status = 404, description = "Source not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_source(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.source_service.delete_case(&auth_user, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// Phases

#[utoipa::path(
    post,
    path = "/api/sources/{id}/phases",
    tag = "sources",
    params(("id" = Uuid, Path, description = "Source ID")),
    request_body = CreatePhaseRequest,
    responses(
        (status = 201, description = "Phase added", body = CasePhase),
        (status = 400, description = "Start date after end date"),
        (status = 404, description = "Source not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_source_phase(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreatePhaseRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let phase = state.source_service.add_phase(&auth_user, id, payload).await?;

    Ok((StatusCode::CREATED, Json(phase)))
}

#[utoipa::path(
    get,
    path = "/api/sources/{id}/phases",
    tag = "sources",
    params(("id" = Uuid, Path, description = "Source ID")),
    responses(
        (status = 200, description = "Phases ordered by position", body = Vec<CasePhase>),
        (status = 404, description = "Source not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_source_phases(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let phases = state.source_service.list_phases(&auth_user, id).await?;

    Ok((StatusCode::OK, Json(phases)))
}

#[utoipa::path(
    put,
    path = "/api/sources/{id}/phases/{phase_id}",
    tag = "sources",
    params(
        ("id" = Uuid, Path, description = "Source ID"),
        ("phase_id" = Uuid, Path, description = "Phase ID")
    ),
    request_body = UpdatePhaseRequest,
    responses(
        (status = 200, description = "Phase updated", body = CasePhase),
        (status = 400, description = "Start date after end date"),
        (status = 404, description = "Phase not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_source_phase(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, phase_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdatePhaseRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let phase = state
        .source_service
        .update_phase(&auth_user, id, phase_id, payload)
        .await?;

    Ok((StatusCode::OK, Json(phase)))
}

#[utoipa::path(
    delete,
    path = "/api/sources/{id}/phases/{phase_id}",
    tag = "sources",
    params(
        ("id" = Uuid, Path, description = "Source ID"),
        ("phase_id" = Uuid, Path, description = "Phase ID")
    ),
    responses(
        (status = 204, description = "Phase deleted"),
        (status = 404, description = "Phase not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_source_phase(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, phase_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state.source_service.delete_phase(&auth_user, id, phase_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// Plan

#[utoipa::path(
    put,
    path = "/api/sources/{id}/plan",
    tag = "sources",
    params(("id" = Uuid, Path, description = "Source ID")),
    request_body = UpsertPlanRequest,
    responses(
        (status = 200, description = "Plan saved", body = CasePlan),
        (status = 404, description = "Source not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upsert_source_plan(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertPlanRequest>,
) -> Result<impl IntoResponse> {
    let plan = state.source_service.upsert_plan(&auth_user, id, payload).await?;

    Ok((StatusCode::OK, Json(plan)))
}

#[utoipa::path(
    get,
    path = "/api/sources/{id}/plan",
    tag = "sources",
    params(("id" = Uuid, Path, description = "Source ID")),
    responses(
        (status = 200, description = "Source plan", body = CasePlan),
        (status = 404, description = "Source or plan not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_source_plan(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let plan = state.source_service.get_plan(&auth_user, id).await?;

    Ok((StatusCode::OK, Json(plan)))
}
