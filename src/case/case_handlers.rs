use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::{
    case_dto::{
        CaseListParams, CreateCaseRequest, CreatePhaseRequest, UpdateCaseRequest,
        UpdatePhaseRequest, UpsertPlanRequest,
    },
    case_models::{CaseDetail, CasePhase, CasePlan},
};
use crate::{error::Result, middleware::AuthUser, state::AppState};

/// Create a case from a template
#[utoipa::path(
    post,
    path = "/api/cases",
    tag = "cases",
    request_body = CreateCaseRequest,
    responses(
        (status = 201, description = "Case created", body = CaseDetail),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Template not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_case(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateCaseRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let case = state.case_service.create_case(&auth_user, payload).await?;

    Ok((StatusCode::CREATED, Json(case)))
}

/// List cases. Staff only see cases assigned to them.
#[utoipa::path(
    get,
    path = "/api/cases",
    tag = "cases",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("limit" = Option<u32>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Search name, description, crime type, applicable law"),
        ("status" = Option<String>, Query, description = "Case status"),
        ("user_id" = Option<Uuid>, Query, description = "Assignee (admin only)"),
        ("sort_order" = Option<String>, Query, description = "ASC or DESC by creation time")
    ),
    responses(
        (status = 200, description = "Paginated cases"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_cases(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<CaseListParams>,
) -> Result<impl IntoResponse> {
    let response = state.case_service.list_cases(&auth_user, params).await?;

    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/cases/{id}",
    tag = "cases",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case with groups, fields and phases", body = CaseDetail),
        (status = 403, description = "Not your case"),
        (status = 404, description = "Case not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_case(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let case = state.case_service.get_case(&auth_user, id).await?;

    Ok((StatusCode::OK, Json(case)))
}

#[utoipa::path(
    put,
    path = "/api/cases/{id}",
    tag = "cases",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = UpdateCaseRequest,
    responses(
        (status = 200, description = "Case updated", body = CaseDetail),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not your case"),
        (status = 404, description = "Case not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_case(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCaseRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let case = state.case_service.update_case(&auth_user, id, payload).await?;

    Ok((StatusCode::OK, Json(case)))
}

#[utoipa::path(
    delete,
    path = "/api/cases/{id}",
    tag = "cases",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 204, description = "Case deleted"),
        (status = 403, description = "Only the assignee or an admin can delete"),
        (status = 404, description = "Case not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_case(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.case_service.delete_case(&auth_user, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// Phases

#[utoipa::path(
    post,
    path = "/api/cases/{id}/phases",
    tag = "cases",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = CreatePhaseRequest,
    responses(
        (status = 201, description = "Phase added", body = CasePhase),
        (status = 400, description = "Start date after end date"),
        (status = 404, description = "Case not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_phase(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreatePhaseRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let phase = state.case_service.add_phase(&auth_user, id, payload).await?;

    Ok((StatusCode::CREATED, Json(phase)))
}

#[utoipa::path(
    get,
    path = "/api/cases/{id}/phases",
    tag = "cases",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Phases ordered by position", body = Vec<CasePhase>),
        (status = 404, description = "Case not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_phases(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let phases = state.case_service.list_phases(&auth_user, id).await?;

    Ok((StatusCode::OK, Json(phases)))
}

#[utoipa::path(
    put,
    path = "/api/cases/{id}/phases/{phase_id}",
    tag = "cases",
    params(
        ("id" = Uuid, Path, description = "Case ID"),
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
pub async fn update_phase(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, phase_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdatePhaseRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let phase = state
        .case_service
        .update_phase(&auth_user, id, phase_id, payload)
        .await?;

    Ok((StatusCode::OK, Json(phase)))
}

#[utoipa::path(
    delete,
    path = "/api/cases/{id}/phases/{phase_id}",
    tag = "cases",
    params(
        ("id" = Uuid, Path, description = "Case ID"),
        ("phase_id" = Uuid, Path, description = "Phase ID")
    ),
    responses(
        (status = 204, description = "Phase deleted"),
        (status = 404, description = "Phase not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_phase(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, phase_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state.case_service.delete_phase(&auth_user, id, phase_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// Plan

#[utoipa::path(
    put,
    path = "/api/cases/{id}/plan",
    tag = "cases",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = UpsertPlanRequest,
    responses(
        (status = 200, description = "Plan saved", body = CasePlan),
        (status = 404, description = "Case not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upsert_plan(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertPlanRequest>,
) -> Result<impl IntoResponse> {
    let plan = state.case_service.upsert_plan(&auth_user, id, payload).await?;

    Ok((StatusCode::OK, Json(plan)))
}

#[utoipa::path(
    get,
    path = "/api/cases/{id}/plan",
    tag = "cases",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case plan", body = CasePlan),
        (status = 404, description = "Case or plan not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_plan(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let plan = state.case_service.get_plan(&auth_user, id).await?;

    Ok((StatusCode::OK, Json(plan)))
}
