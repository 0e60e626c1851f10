use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::{
    docx::DOCX_CONTENT_TYPE,
    report_dto::{CaseDocumentData, CaseStatistics, CaseStatisticsParams},
};
use crate::{error::Result, middleware::AuthUser, state::AppState};

/// Case counts per status
#[utoipa::path(
    get,
    path = "/api/reports/case-statistics",
    tag = "reports",
    params(
        ("start_date" = Option<String>, Query, description = "YYYY-MM-DD, inclusive"),
        ("end_date" = Option<String>, Query, description = "YYYY-MM-DD, inclusive"),
        ("user_id" = Option<Uuid>, Query, description = "Assignee (admin only)")
    ),
    responses(
        (status = 200, description = "Case statistics", body = CaseStatistics),
        (status = 400, description = "start_date after end_date"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn case_statistics(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<CaseStatisticsParams>,
) -> Result<impl IntoResponse> {
    let stats = state.report_service.case_statistics(&auth_user, params).await?;

    Ok((StatusCode::OK, Json(stats)))
}

/// Values for the case report document
#[utoipa::path(
    get,
    path = "/api/reports/cases/{id}/document-data",
    tag = "reports",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Document data", body = CaseDocumentData),
        (status = 403, description = "Not your case"),
        (status = 404, description = "Case not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn case_document_data(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let data = state.report_service.case_document_data(&auth_user, id).await?;

    Ok((StatusCode::OK, Json(data)))
}

/// Download the case report as a Word document
#[utoipa::path(
    get,
    path = "/api/reports/cases/{id}/export",
    tag = "reports",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Filled report template",
         content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 403, description = "Not your case"),
        (status = 404, description = "Case not found"),
        (status = 500, description = "Template could not be rendered")
    ),
    security(("bearer_auth" = []))
)]
pub async fn export_case_report(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let report = state.report_service.case_report_docx(&auth_user, id).await?;

    let headers = [
        (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.file_name),
        ),
    ];

    Ok((StatusCode::OK, headers, report.bytes))
}
