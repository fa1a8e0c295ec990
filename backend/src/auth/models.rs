use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::database::models::{Role, User};

/// JWT payload carried by both access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a hex ObjectId.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 100, message = "Full name must be at least 3 characters"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    #[validate(length(min = 10, max = 20, message = "Invalid phone number"))]
    pub phone_number: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Reset code is required"))]
    pub code: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_new_password: String,
}

/// Sanitized user representation returned to clients.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub role: Role,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            role: user.role,
            created_at: user.created_at.to_chrono().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn register_request_validation() {
        let ok = RegisterRequest {
            full_name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            password: "long-enough".into(),
            confirm_password: "long-enough".into(),
            phone_number: "0501234567".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            full_name: "J".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            confirm_password: "different".into(),
            phone_number: "123".into(),
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
        assert!(errors.field_errors().contains_key("full_name"));
        assert!(errors.field_errors().contains_key("confirm_password"));
    }

    #[test]
    fn user_response_strips_password() {
        let user = User::new(
            "Jane Doe".into(),
            "jane@example.com".into(),
            "secret-hash".into(),
            "0501234567".into(),
            Role::User,
        );
        let response = UserResponse::from(&user);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains(&user.id.to_hex()));
    }
}
