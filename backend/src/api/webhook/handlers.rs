//! Payment provider webhook. Receives the raw body because the signature
//! covers the exact bytes on the wire.

use std::sync::Arc;

use adapters::models::WebhookEvent;
use adapters::stripe::{verify_webhook_signature, SIGNATURE_TOLERANCE_SECS};
use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::{ApiError, ApiResult};
use crate::services::checkout;
use crate::state::AppState;

const COMPLETED: &str = "checkout.session.completed";

pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Stripe-Signature header".into()))?;

    verify_webhook_signature(
        &state.config.stripe_webhook_secret,
        signature,
        body.as_bytes(),
        Utc::now().timestamp(),
        SIGNATURE_TOLERANCE_SECS,
    )
    .map_err(|e| {
        warn!(error = %e, "webhook signature rejected");
        ApiError::BadRequest("Invalid webhook signature".into())
    })?;

    let event: WebhookEvent = serde_json::from_str(&body)
        .map_err(|_| ApiError::BadRequest("Malformed webhook payload".into()))?;

    if event.event_type == COMPLETED {
        let session = event.data.object;
        info!(session = %session.id, "checkout session completed");
        checkout::fulfill(&state, &session).await?;
    } else {
        // Anything else is acknowledged so the provider stops retrying.
        info!(event_type = %event.event_type, "webhook event ignored");
    }

    Ok(Json(json!({ "received": true })))
}
