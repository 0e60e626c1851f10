use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    Json,
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use uuid::Uuid;
use validator::Validate;

use super::{
    deadline_scheduler::ScanReport,
    notification_dto::{
        BroadcastRequest, BroadcastResponse, CreateNotificationRequest, MarkAllReadResponse,
        NotificationListParams, UnreadCountResponse,
    },
    notification_models::Notification,
};
use crate::{dto::Page, error::Result, middleware::AuthUser, state::AppState};

/// List notifications for the current user, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notifications",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("limit" = Option<u32>, Query, description = "Items per page"),
        ("is_read" = Option<bool>, Query, description = "Filter by read state")
    ),
    responses(
        (status = 200, description = "Paginated notifications"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<NotificationListParams>,
) -> Result<impl IntoResponse> {
    let page = Page::new(params.page, params.limit);
    let response = state
        .notification_service
        .list(auth_user.id, params.is_read, page)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "notifications",
    responses(
        (status = 200, description = "Number of unread notifications", body = UnreadCountResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_unread_count(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse> {
    let count = state.notification_service.unread_count(auth_user.id).await?;

    Ok((StatusCode::OK, Json(UnreadCountResponse { count })))
}

/// Subscribe to the current user's notifications via Server-Sent Events
#[utoipa::path(
    get,
    path = "/api/notifications/stream",
    tag = "notifications",
    responses(
        (status = 200, description = "SSE stream of notifications"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn notification_stream(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.notification_tx.subscribe();
    let user_id = auth_user.id;

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |msg| async move {
        match msg {
            Ok(notification) if notification.user_id == user_id => Event::default()
                .event("notification")
                .json_data(&notification)
                .ok()
                .map(Ok),
            // Lagged receivers just miss events
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Mark notification as read
#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/read",
    tag = "notifications",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 404, description = "Notification not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let notification = state
        .notification_service
        .mark_as_read(notification_id, auth_user.id)
        .await?;

    Ok((StatusCode::OK, Json(notification)))
}

#[utoipa::path(
    patch,
    path = "/api/notifications/read-all",
    tag = "notifications",
    responses(
        (status = 200, description = "All notifications marked as read", body = MarkAllReadResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse> {
    let updated = state.notification_service.mark_all_as_read(auth_user.id).await?;

    Ok((StatusCode::OK, Json(MarkAllReadResponse { updated })))
}

/// Delete a notification
#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "notifications",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .notification_service
        .delete(notification_id, auth_user.id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// Admin endpoints

/// Send a notification to one user (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/notifications",
    tag = "admin",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created", body = Notification),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_notification(
    State(state): State<AppState>,
    Json(payload): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let notification = state.notification_service.create(payload).await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// Push an announcement to every registered device (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/notifications/broadcast",
    tag = "admin",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Broadcast sent", body = BroadcastResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn broadcast_notification(
    State(state): State<AppState>,
    Json(payload): Json<BroadcastRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let response = state.notification_service.broadcast(payload).await?;

    Ok((StatusCode::OK, Json(response)))
}

/// Run the deadline scan immediately (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/notifications/deadline-check",
    tag = "admin",
    responses(
        (status = 200, description = "Scan finished", body = ScanReport),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn run_deadline_check(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let report = state.notification_service.run_deadline_check().await?;

    Ok((StatusCode::OK, Json(report)))
}
