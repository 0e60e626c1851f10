use crate::{
    auth::hash_password,
    dto::{Page, PaginatedResponse},
    error::{AppError, Result},
    user::{
        user_dto::{
            AdminUpdateUserRequest, CreateUserRequest, UpdateProfileRequest, UpdatePushTokensRequest,
        },
        user_models::{Role, UserOption, UserResponse},
        user_repository::UserRepository,
    },
};
use uuid::Uuid;

pub const SELECT_LIMIT: i64 = 50;

fn parse_role(role: Option<&str>) -> Result<Option<Role>> {
    role.map(|r| r.parse::<Role>().map_err(AppError::Validation))
        .transpose()
}

#[derive(Clone)]
pub struct UserService {
    user_repository: UserRepository,
}

impl UserService {
    pub fn new(user_repository: UserRepository) -> Self {
        Self { user_repository }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user.into())
    }

    pub async fn update_current_user(
        &self,
        user_id: Uuid,
        payload: UpdateProfileRequest,
    ) -> Result<UserResponse> {
        let user = self
            .user_repository
            .update_profile(user_id, payload.full_name.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(UserResponse::from(user))
    }

    pub async fn update_push_tokens(
        &self,
        user_id: Uuid,
        payload: UpdatePushTokensRequest,
    ) -> Result<UserResponse> {
        if payload.token_expo.is_none() && payload.fcm_token.is_none() {
            return Err(AppError::BadRequest("No push token provided".to_string()));
        }

        let user = self
            .user_repository
            .update_push_tokens(user_id, payload.token_expo.as_deref(), payload.fcm_token.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %user_id, "Push tokens updated");
        Ok(UserResponse::from(user))
    }

    pub async fn list_users(&self, q: Option<&str>, page: Page) -> Result<PaginatedResponse<UserResponse>> {
        let q = q.filter(|q| !q.trim().is_empty());
        let users = self
            .user_repository
            .find_all(q, page.limit as i64, page.offset())
            .await?;
        let total = self.user_repository.count_all(q).await?;

        Ok(PaginatedResponse::new(
            users.into_iter().map(UserResponse::from).collect(),
            total,
            page,
        ))
    }

    /// Search for the assignee picker. Open to any signed-in user.
    pub async fn select_users(&self, q: Option<&str>) -> Result<Vec<UserOption>> {
        let q = q.map(str::trim).filter(|q| !q.is_empty());
        self.user_repository.select_users(q, SELECT_LIMIT).await
    }

    pub async fn create_user(&self, payload: CreateUserRequest) -> Result<UserResponse> {
        let role = parse_role(payload.role.as_deref())?.unwrap_or(Role::Staff);
        let password_hash = hash_password(&payload.password)?;

        let user = self
            .user_repository
            .create(
                payload.phone.trim(),
                payload.full_name.trim(),
                &password_hash,
                role.as_str(),
            )
            .await
            .map_err(|e| e.on_constraint("Phone number already in use"))?;

        tracing::info!(user_id = %user.id, role = %role, "User created by admin");
        Ok(UserResponse::from(user))
    }

    pub async fn admin_update_user(
        &self,
        user_id: Uuid,
        payload: AdminUpdateUserRequest,
    ) -> Result<UserResponse> {
        let role = parse_role(payload.role.as_deref())?;

        let user = self
            .user_repository
            .admin_update_user(
                user_id,
                payload.full_name.as_deref(),
                payload.phone.as_deref(),
                role.map(|r| r.as_str()),
            )
            .await
            .map_err(|e| e.on_constraint("Phone number already in use"))?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(UserResponse::from(user))
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        let rows_affected = self.user_repository.delete_user(user_id).await?;
        if rows_affected == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        tracing::info!(user_id = %user_id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(None).unwrap(), None);
        assert_eq!(parse_role(Some("admin")).unwrap(), Some(Role::Admin));
        assert!(matches!(parse_role(Some("root")), Err(AppError::Validation(_))));
    }
}
