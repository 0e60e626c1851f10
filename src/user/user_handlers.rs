use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::Page,
    error::Result,
    middleware::AuthUser,
    state::AppState,
    user::{
        user_dto::{
            AdminUpdateUserRequest, CreateUserRequest, UpdateProfileRequest, UpdatePushTokensRequest,
            UserListParams, UserSelectParams,
        },
        user_models::{UserOption, UserResponse},
    },
};

/// Get current user profile
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    responses(
        (status = 200, description = "User profile retrieved successfully", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get_user(auth_user.id).await?;

    Ok((StatusCode::OK, Json(user)))
}

/// Update current user profile
#[utoipa::path(
    put,
    path = "/api/users/me",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated successfully", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let user = state
        .user_service
        .update_current_user(auth_user.id, payload)
        .await?;

    Ok((StatusCode::OK, Json(user)))
}

/// Register Expo and/or FCM push tokens for the current device
#[utoipa::path(
    put,
    path = "/api/users/me/push-tokens",
    tag = "users",
    request_body = UpdatePushTokensRequest,
    responses(
        (status = 200, description = "Push tokens saved", body = UserResponse),
        (status = 400, description = "No token provided"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_push_tokens(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<UpdatePushTokensRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let user = state
        .user_service
        .update_push_tokens(auth_user.id, payload)
        .await?;

    Ok((StatusCode::OK, Json(user)))
}

/// Users for the assignee picker, matched on phone or full name
#[utoipa::path(
    get,
    path = "/api/users/all/select",
    tag = "users",
    params(
        ("q" = Option<String>, Query, description = "Search by phone or full name")
    ),
    responses(
        (status = 200, description = "Matching users", body = Vec<UserOption>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn select_users(
    State(state): State<AppState>,
    Query(params): Query<UserSelectParams>,
) -> Result<impl IntoResponse> {
    let users = state.user_service.select_users(params.q.as_deref()).await?;

    Ok((StatusCode::OK, Json(users)))
}

// Admin endpoints

/// Create a user account (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "admin",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 409, description = "Phone number already in use")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let user = state.user_service.create_user(payload).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// List users (admin only)
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("limit" = Option<u32>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Search by phone or full name")
    ),
    responses(
        (status = 200, description = "Users retrieved successfully"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_all_users(
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse> {
    let page = Page::new(params.page, params.limit);
    let response = state
        .user_service
        .list_users(params.q.as_deref(), page)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

/// Get specific user by ID (admin only)
#[utoipa::path(
    get,
    path = "/api/admin/users/{user_id}",
    tag = "admin",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = UserResponse),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get_user(user_id).await?;

    Ok((StatusCode::OK, Json(user)))
}

/// Update user (admin only)
#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}",
    tag = "admin",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Phone number already in use")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn admin_update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let user = state.user_service.admin_update_user(user_id, payload).await?;

    Ok((StatusCode::OK, Json(user)))
}

/// Delete user (admin only)
#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    tag = "admin",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted successfully"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.user_service.delete_user(user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
