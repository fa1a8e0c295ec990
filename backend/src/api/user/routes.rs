use std::sync::Arc;

use axum::{
    routing::{delete, get, put},
    Router,
};

use crate::api::user::handlers;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(handlers::me).put(handlers::update_me))
        .route("/me/password", put(handlers::change_password))
        .route("/", get(handlers::list_users))
        .route("/:id", delete(handlers::delete_user))
}
