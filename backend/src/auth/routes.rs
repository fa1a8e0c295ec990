use std::sync::Arc;

use axum::{routing::post, Router};

use crate::auth::handlers;
use crate::middleware::{IpRateLimiter, RateLimitLayer};
use crate::state::AppState;

pub fn router(login_limiter: Arc<IpRateLimiter>) -> Router<Arc<AppState>> {
    let login = Router::new()
        .route("/login", post(handlers::login))
        .route_layer(RateLimitLayer::new(login_limiter));

    Router::new()
        .route("/register", post(handlers::register))
        .route("/refresh-token", post(handlers::refresh_token))
        .route("/logout", post(handlers::logout))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password", post(handlers::reset_password))
        .merge(login)
}
