use crate::auth::auth_repository::RefreshTokenRepository;
use crate::auth::jwt::REFRESH_TOKEN;
use crate::auth::{create_access_token, create_refresh_token, hash_password, verify_jwt, verify_password};
use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::state::Config;
use crate::user::user_models::User;
use crate::user::user_repository::UserRepository;
use chrono::{Duration, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthService {
    db: DbPool,
    user_repo: UserRepository,
    refresh_token_repo: RefreshTokenRepository,
    config: Arc<Config>,
}

impl AuthService {
    pub fn new(
        db: DbPool,
        user_repo: UserRepository,
        refresh_token_repo: RefreshTokenRepository,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db,
            user_repo,
            refresh_token_repo,
            config,
        }
    }

    fn issue_tokens(&self, user: &User) -> Result<(String, String)> {
        let access_token = create_access_token(
            user.id,
            &user.phone,
            &user.role,
            &self.config.jwt_secret,
            self.config.access_token_minutes,
        )?;
        let refresh_token = create_refresh_token(
            user.id,
            &user.phone,
            &user.role,
            &self.config.jwt_secret,
            self.config.refresh_token_days,
        )?;

        Ok((access_token, refresh_token))
    }

    pub async fn register(
        &self,
        phone: &str,
        password: &str,
        full_name: Option<&str>,
        referral_code: Option<&str>,
    ) -> Result<(User, String, String)> {
        if let Some(expected) = self.config.registration_code.as_deref() {
            if referral_code != Some(expected) {
                return Err(AppError::Unauthorized("Invalid referral code".into()));
            }
        }

        if self.user_repo.exists_by_phone(phone).await? {
            return Err(AppError::Conflict("Phone number already registered".into()));
        }

        let password_hash = hash_password(password)?;

        let mut tx = self.db.begin().await?;

        let user = self
            .user_repo
            .create_with_tx(&mut tx, phone, full_name, &password_hash)
            .await
            .map_err(|e| e.on_constraint("Phone number already registered"))?;

        let (access_token, refresh_token) = self.issue_tokens(&user)?;

        let expires_at = Utc::now() + Duration::days(self.config.refresh_token_days);
        self.refresh_token_repo
            .create_with_tx(&mut tx, user.id, &refresh_token, expires_at)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok((user, access_token, refresh_token))
    }

    pub async fn login(&self, phone: &str, password: &str) -> Result<(User, String, String)> {
        let user = self
            .user_repo
            .find_by_phone(phone)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid credentials".into()))?;

        if !verify_password(password, &user.password_hash) {
            return Err(AppError::Authentication("Invalid credentials".into()));
        }

        let (access_token, refresh_token) = self.issue_tokens(&user)?;

        let mut tx = self.db.begin().await?;

        let expires_at = Utc::now() + Duration::days(self.config.refresh_token_days);
        self.refresh_token_repo
            .create_with_tx(&mut tx, user.id, &refresh_token, expires_at)
            .await?;

        tx.commit().await?;

        Ok((user, access_token, refresh_token))
    }

    /// Exchanges a refresh token for a new pair; the old one is revoked.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<(String, String)> {
        let claims = verify_jwt(refresh_token, &self.config.jwt_secret)?;
        if claims.kind != REFRESH_TOKEN {
            return Err(AppError::Authentication("Invalid refresh token".into()));
        }

        let stored = self
            .refresh_token_repo
            .find_by_token(refresh_token)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid refresh token".into()))?;

        if stored.user_id.to_string() != claims.sub {
            return Err(AppError::Authentication("Invalid token claims".into()));
        }

        let user = self
            .user_repo
            .find_by_id(stored.user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("User not found".into()))?;

        let (new_access_token, new_refresh_token) = self.issue_tokens(&user)?;

        let mut tx = self.db.begin().await?;

        let revoked = self
            .refresh_token_repo
            .delete_by_token_with_tx(&mut tx, refresh_token)
            .await?;
        if revoked == 0 {
            // Lost a race with a concurrent refresh or logout.
            return Err(AppError::Authentication("Invalid refresh token".into()));
        }

        let expires_at = Utc::now() + Duration::days(self.config.refresh_token_days);
        self.refresh_token_repo
            .create_with_tx(&mut tx, user.id, &new_refresh_token, expires_at)
            .await?;

        tx.commit().await?;

        Ok((new_access_token, new_refresh_token))
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        self.refresh_token_repo.delete_by_token(refresh_token).await?;
        Ok(())
    }

    pub async fn purge_expired_tokens(&self) -> Result<u64> {
        self.refresh_token_repo.delete_expired().await
    }
}
