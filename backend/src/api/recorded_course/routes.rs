use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::recorded_course::handlers;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::list).post(handlers::create))
        .route(
            "/:id",
            get(handlers::get).put(handlers::update).delete(handlers::remove),
        )
        .route("/book", post(handlers::book))
        .route("/verify-payment", post(handlers::verify_payment))
}
