//! HTTP surface: one module per resource, each with its own routes and
//! handlers, assembled into the `/api` router here.

pub mod consultation;
pub mod contact;
pub mod content;
pub mod course;
pub mod event;
pub mod faq;
pub mod in_person_course;
pub mod podcast;
pub mod recorded_course;
pub mod user;
pub mod webhook;

use std::sync::Arc;

use axum::Router;

use crate::auth;
use crate::middleware::IpRateLimiter;
use crate::state::AppState;

pub fn router(login_limiter: Arc<IpRateLimiter>) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/auth", auth::routes::router(login_limiter))
        .nest("/users", user::routes::router())
        .nest("/courses", course::routes::router())
        .nest("/recorded-courses", recorded_course::routes::router())
        .nest("/in-person-courses", in_person_course::routes::router())
        .nest("/consultations", consultation::routes::router())
        .nest("/events", event::routes::router())
        .nest("/faqs", faq::routes::router())
        .nest("/podcasts", podcast::routes::router())
        .nest("/contact", contact::routes::router())
        .nest("/user-content", content::routes::router())
        .nest("/stripe", webhook::routes::router())
}
