use crate::error::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub phone: String,
    pub role: String,
    pub jti: String,
    /// `access` or `refresh`.
    pub kind: String,
    pub exp: i64,
}

pub const ACCESS_TOKEN: &str = "access";
pub const REFRESH_TOKEN: &str = "refresh";

fn sign(
    user_id: Uuid,
    phone: &str,
    role: &str,
    kind: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or(AppError::InternalError)?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        phone: phone.to_string(),
        role: role.to_string(),
        jti: Uuid::new_v4().to_string(),
        kind: kind.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Authentication("Failed to create token".to_string()))
}

/// Short-lived token sent on every request.
pub fn create_access_token(
    user_id: Uuid,
    phone: &str,
    role: &str,
    secret: &str,
    minutes: i64,
) -> Result<String> {
    sign(user_id, phone, role, ACCESS_TOKEN, secret, Duration::minutes(minutes))
}

/// Long-lived token, also persisted so it can be revoked.
pub fn create_refresh_token(
    user_id: Uuid,
    phone: &str,
    role: &str,
    secret: &str,
    days: i64,
) -> Result<String> {
    sign(user_id, phone, role, REFRESH_TOKEN, secret, Duration::days(days))
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_round_trip_claims() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, "0900000000", "ADMIN", "secret", 15).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.phone, "0900000000");
        assert_eq!(claims.role, "ADMIN");
        assert_eq!(claims.kind, ACCESS_TOKEN);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_access_token(Uuid::new_v4(), "0900000000", "STAFF", "secret", 15).unwrap();
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Past the default 60s leeway.
        let token = create_access_token(Uuid::new_v4(), "0900000000", "STAFF", "secret", -5).unwrap();
        assert!(verify_jwt(&token, "secret").is_err());
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let user_id = Uuid::new_v4();
        let a = create_refresh_token(user_id, "0900000000", "STAFF", "secret", 7).unwrap();
        let b = create_refresh_token(user_id, "0900000000", "STAFF", "secret", 7).unwrap();
        assert_ne!(a, b);
        assert_eq!(verify_jwt(&a, "secret").unwrap().kind, REFRESH_TOKEN);
    }
}
