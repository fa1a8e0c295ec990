use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use bson::{doc, DateTime, Document};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::auth::middleware::{AdminUser, AuthUser};
use crate::auth::models::UserResponse;
use crate::auth::service;
use crate::database::queries;
use crate::errors::{validate, ApiError, ApiResult};
use crate::state::AppState;
use crate::utils::parse_object_id;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 100, message = "Full name must be at least 3 characters"))]
    pub full_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 10, max = 20, message = "Invalid phone number"))]
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

pub async fn me(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "status": "success", "user": UserResponse::from(&user) }))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    validate(&payload)?;

    let mut changes = Document::new();
    if let Some(full_name) = payload.full_name {
        changes.insert("full_name", full_name);
    }
    if let Some(email) = payload.email {
        if email != user.email
            && queries::find_user_by_email(&state.db, &email).await?.is_some()
        {
            return Err(ApiError::Conflict("Email is already registered".into()));
        }
        changes.insert("email", email);
    }
    if let Some(phone_number) = payload.phone_number {
        changes.insert("phone_number", phone_number);
    }
    if changes.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".into()));
    }
    changes.insert("updated_at", DateTime::now());

    state
        .db
        .users()
        .update_one(doc! { "_id": user.id }, doc! { "$set": changes })
        .await?;

    let updated = queries::find_user_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Profile updated",
        "user": UserResponse::from(&updated),
    })))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    validate(&payload)?;

    if !service::verify_password(&payload.current_password, &user.password)? {
        return Err(ApiError::BadRequest("Current password is incorrect".into()));
    }

    let hash = service::hash_password(&payload.new_password)?;
    state
        .db
        .users()
        .update_one(
            doc! { "_id": user.id },
            doc! { "$set": { "password": hash, "updated_at": DateTime::now() } },
        )
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Password changed",
    })))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> ApiResult<Json<Value>> {
    let users: Vec<_> = state
        .db
        .users()
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;
    let data: Vec<UserResponse> = users.iter().map(UserResponse::from).collect();

    Ok(Json(json!({
        "status": "success",
        "count": data.len(),
        "users": data,
    })))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let target_id = parse_object_id(&id)?;
    let target = queries::find_user_by_id(&state.db, target_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if target.is_admin() {
        return Err(ApiError::Forbidden("Admin accounts cannot be deleted".into()));
    }

    state.db.users().delete_one(doc! { "_id": target_id }).await?;
    info!(admin = %admin.id, deleted = %target_id, "user account deleted");

    Ok(Json(json!({
        "status": "success",
        "message": "User deleted",
    })))
}
