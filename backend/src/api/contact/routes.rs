use std::sync::Arc;

use axum::{routing::post, Router};

use crate::api::contact::handlers;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(handlers::submit))
}
