use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 256))]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePushTokensRequest {
    #[validate(length(max = 512))]
    pub token_expo: Option<String>,
    #[validate(length(max = 512))]
    pub fcm_token: Option<String>,
}

/// Assignee picker search.
#[derive(Debug, Deserialize)]
pub struct UserSelectParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub q: Option<String>,
}

// Admin DTOs
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, max = 256))]
    pub full_name: Option<String>,
    #[validate(length(min = 8, max = 32))]
    pub phone: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 256))]
    pub full_name: String,
    #[validate(length(min = 8, max = 32))]
    pub phone: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    /// Defaults to STAFF.
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(full_name: &str, phone: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            full_name: full_name.to_string(),
            phone: phone.to_string(),
            password: password.to_string(),
            role: None,
        }
    }

    #[test]
    fn test_create_user_request_validation() {
        assert!(create_request("Trần Thị B", "0912345678", "secret1").validate().is_ok());
        assert!(create_request("", "0912345678", "secret1").validate().is_err());
        assert!(create_request("Trần Thị B", "0912", "secret1").validate().is_err());
        assert!(create_request("Trần Thị B", "0912345678", "123").validate().is_err());
    }

    #[test]
    fn test_create_user_request_deserializes_optional_role() {
        let request: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "full_name": "Lê Văn C",
            "phone": "0987654321",
            "password": "secret1"
        }))
        .unwrap();
        assert!(request.role.is_none());
    }
}
