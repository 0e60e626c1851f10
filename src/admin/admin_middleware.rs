use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use crate::{
    error::{AppError, Result},
    middleware::AuthUser,
    state::AppState,
    user::user_models::Role,
};

/// Requires the caller to hold the ADMIN role.
///
/// The role is re-read from the database so that a demotion takes effect
/// before the caller's access token expires.
pub async fn admin_authorization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response> {
    if !auth_user.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    let user = state
        .user_repository
        .find_by_id(auth_user.id)
        .await?
        .ok_or(AppError::Unauthorized("User no longer exists".to_string()))?;

    if !user.role().satisfies(Role::Admin) {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}
