use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use validator::Validate;

use crate::errors::{validate, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 200, message = "Subject must be at least 3 characters"))]
    pub subject: String,
    #[validate(length(min = 10, max = 5000, message = "Message must be at least 10 characters"))]
    pub message: String,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ContactRequest>,
) -> ApiResult<Json<Value>> {
    validate(&payload)?;

    let admin_html = format!(
        "<h3>New contact message</h3>\
         <p><strong>From:</strong> {} &lt;{}&gt;</p>\
         <p><strong>Subject:</strong> {}</p>\
         <p>{}</p>",
        payload.name, payload.email, payload.subject, payload.message
    );
    state
        .mailer
        .send(
            &state.config.contact_email,
            &format!("Contact form: {}", payload.subject),
            &admin_html,
        )
        .await?;

    let user_html = format!(
        "<p>Hello {},</p>\
         <p>We received your message and will get back to you soon.</p>",
        payload.name
    );
    if let Err(e) = state
        .mailer
        .send(&payload.email, "We received your message", &user_html)
        .await
    {
        // The admin copy went out; the confirmation is best effort.
        warn!(error = %e, "failed to send contact confirmation email");
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Message sent",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_request_bounds() {
        let ok = ContactRequest {
            name: "Jo".into(),
            email: "jo@example.com".into(),
            subject: "Hi there".into(),
            message: "I have a question about courses.".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = ContactRequest {
            name: "J".into(),
            email: "nope".into(),
            subject: "ab".into(),
            message: "short".into(),
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("subject"));
        assert!(errors.field_errors().contains_key("message"));
    }
}
