use std::sync::Arc;

use axum::{routing::get, Router};

use crate::api::course::handlers;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::list_courses))
        .route("/:id", get(handlers::get_course))
}
