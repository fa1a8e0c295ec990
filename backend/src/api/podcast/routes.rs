use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};

use crate::api::podcast::handlers;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::list).post(handlers::create))
        .route("/admin/all", get(handlers::list_all))
        .route(
            "/:id",
            get(handlers::get).put(handlers::update).delete(handlers::remove),
        )
        .route("/:id/toggle-status", patch(handlers::toggle_status))
}
