use std::sync::Arc;

use axum::{routing::post, Router};

use crate::api::webhook::handlers;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(handlers::stripe_webhook))
}
