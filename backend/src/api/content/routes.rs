use std::sync::Arc;

use axum::{routing::get, Router};

use crate::api::content::handlers;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(handlers::user_content))
}
