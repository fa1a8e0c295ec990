//! Global application error types and handlers.
//!
//! Every handler returns `ApiError` on failure; its `IntoResponse`
//! implementation renders the JSON envelope the frontend expects:
//! `{"status":"error","message":...}` plus per-field messages for
//! validation failures. Infrastructure errors are logged and collapsed
//! into a generic 500 so internals never leak to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::error;
use validator::{Validate, ValidationErrors};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid input data")]
    Validation(ValidationErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error(transparent)]
    Adapter(#[from] adapters::errors::AdapterError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Adapter(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            ApiError::Validation(errors) => json!({
                "status": "error",
                "message": "Invalid input data",
                "errors": field_errors(errors),
            }),
            ApiError::Database(e) => {
                error!(error = %e, "database error");
                generic_error()
            }
            ApiError::Adapter(e) => {
                error!(error = %e, "provider error");
                generic_error()
            }
            ApiError::Internal(message) => {
                error!(error = %message, "internal error");
                generic_error()
            }
            other => json!({
                "status": "error",
                "message": other.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

fn generic_error() -> Value {
    json!({
        "status": "error",
        "message": "Internal server error",
    })
}

fn field_errors(errors: &ValidationErrors) -> Value {
    let mut fields = Map::new();
    for (field, issues) in errors.field_errors() {
        let messages: Vec<String> = issues
            .iter()
            .map(|issue| {
                issue
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| issue.code.to_string())
            })
            .collect();
        fields.insert(field.to_string(), json!(messages));
    }
    Value::Object(fields)
}

/// Run `validator` checks, mapping failures into the validation envelope.
pub fn validate(input: &impl Validate) -> Result<(), ApiError> {
    input.validate().map_err(ApiError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn status_codes_match_variants() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_failure_carries_field_messages() {
        let sample = Sample {
            name: "ab".into(),
            email: "not-an-email".into(),
        };
        let errors = sample.validate().unwrap_err();
        let fields = field_errors(&errors);

        assert_eq!(fields["name"][0], "too short");
        assert!(fields.get("email").is_some());
    }

    #[test]
    fn validate_helper_passes_clean_input() {
        let sample = Sample {
            name: "abc".into(),
            email: "a@b.co".into(),
        };
        assert!(validate(&sample).is_ok());
    }
}
