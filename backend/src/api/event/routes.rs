use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::event::handlers;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::list).post(handlers::create))
        .route(
            "/:id",
            get(handlers::get).put(handlers::update).delete(handlers::remove),
        )
        .route("/:id/register", post(handlers::register))
}
