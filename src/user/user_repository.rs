use crate::{
    dto::like_pattern,
    error::Result,
    notification::{notifier::UserDirectory, push::PushRecipient},
};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use super::user_models::{User, UserOption};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_with_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        phone: &str,
        full_name: Option<&str>,
        password_hash: &str,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (phone, full_name, password_hash) VALUES ($1, $2, $3) RETURNING *"
        )
        .bind(phone)
        .bind(full_name)
        .bind(password_hash)
        .fetch_one(&mut **tx)
        .await?;

        Ok(user)
    }

    pub async fn create(
        &self,
        phone: &str,
        full_name: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (phone, full_name, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING *"
        )
        .bind(phone)
        .bind(full_name)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn exists_by_phone(&self, phone: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE phone = $1)")
            .bind(phone)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn find_all(&self, q: Option<&str>, limit: i64, offset: i64) -> Result<Vec<User>> {
        let pattern = q.map(like_pattern);
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users
             WHERE ($1::text IS NULL OR phone ILIKE $1 OR full_name ILIKE $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        )
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn count_all(&self, q: Option<&str>) -> Result<i64> {
        let pattern = q.map(like_pattern);
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users
             WHERE ($1::text IS NULL OR phone ILIKE $1 OR full_name ILIKE $1)"
        )
        .bind(pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    pub async fn select_users(&self, q: Option<&str>, limit: i64) -> Result<Vec<UserOption>> {
        let pattern = q.map(like_pattern);
        let users = sqlx::query_as::<_, UserOption>(
            "SELECT id, full_name, phone FROM users
             WHERE ($1::text IS NULL OR phone ILIKE $1 OR full_name ILIKE $1)
             ORDER BY full_name ASC NULLS LAST, phone ASC
             LIMIT $2"
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn update_profile(&self, user_id: Uuid, full_name: Option<&str>) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET
                full_name = COALESCE($1, full_name),
                updated_at = NOW()
             WHERE id = $2
             RETURNING *"
        )
        .bind(full_name)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn admin_update_user(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        phone: Option<&str>,
        role: Option<&str>,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET
                full_name = COALESCE($1, full_name),
                phone = COALESCE($2, phone),
                role = COALESCE($3, role),
                updated_at = NOW()
             WHERE id = $4
             RETURNING *"
        )
        .bind(full_name)
        .bind(phone)
        .bind(role)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn update_push_tokens(
        &self,
        user_id: Uuid,
        token_expo: Option<&str>,
        fcm_token: Option<&str>,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET
                token_expo = COALESCE($1, token_expo),
                fcm_token = COALESCE($2, fcm_token),
                updated_at = NOW()
             WHERE id = $3
             RETURNING *"
        )
        .bind(token_expo)
        .bind(fcm_token)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_expo_tokens(&self) -> Result<Vec<String>> {
        let tokens: Vec<String> = sqlx::query_scalar(
            "SELECT token_expo FROM users WHERE token_expo IS NOT NULL"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_recipient(&self, user_id: Uuid) -> Result<Option<PushRecipient>> {
        let recipient = self.find_by_id(user_id).await?.map(|user| PushRecipient {
            user_id: user.id,
            token_expo: user.token_expo,
            fcm_token: user.fcm_token,
        });

        Ok(recipient)
    }
}
