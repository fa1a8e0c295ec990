use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::api::consultation::handlers;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::create))
        .route("/available", get(handlers::available))
        .route("/book/:id", put(handlers::book_offline))
        .route("/create-checkout-session", post(handlers::create_checkout_session))
        .route("/verify-payment", get(handlers::verify_payment))
        .route("/payments-history", get(handlers::payments_history))
        .route("/all-payments", get(handlers::all_payments))
}
