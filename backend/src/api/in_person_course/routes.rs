use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::api::in_person_course::handlers;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::list).post(handlers::create))
        .route(
            "/:id",
            get(handlers::get).put(handlers::update).delete(handlers::remove),
        )
        .route("/checkout-session", post(handlers::checkout_session))
        .route("/verify-payment", post(handlers::verify_payment))
        .route("/bookings/user", get(handlers::user_bookings))
        .route("/cleanup-expired", delete(handlers::cleanup_expired))
}
