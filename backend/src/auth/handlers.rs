use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::CookieJar;
use bson::{doc, DateTime};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::models::*;
use crate::auth::service::{self, ACCESS_COOKIE, REFRESH_COOKIE, RESET_CODE_TTL_SECS};
use crate::database::models::{Role, User};
use crate::database::queries;
use crate::errors::{validate, ApiError, ApiResult};
use crate::state::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, CookieJar, Json<Value>)> {
    validate(&payload)?;

    if queries::find_user_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Email is already registered".into()));
    }

    let hash = service::hash_password(&payload.password)?;
    let user = User::new(
        payload.full_name,
        payload.email,
        hash,
        payload.phone_number,
        Role::User,
    );
    state.db.users().insert_one(&user).await?;
    info!(user = %user.id, "new account registered");

    let access = service::issue_access_token(&user, &state.config.jwt_access_secret)?;
    let refresh = service::issue_refresh_token(&user, &state.config.jwt_refresh_secret)?;
    let jar = jar
        .add(service::access_cookie(access))
        .add(service::refresh_cookie(refresh));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({
            "status": "success",
            "message": "Account created",
            "user": UserResponse::from(&user),
        })),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    validate(&payload)?;

    let user = queries::find_user_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !service::verify_password(&payload.password, &user.password)? {
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let access = service::issue_access_token(&user, &state.config.jwt_access_secret)?;
    let refresh = service::issue_refresh_token(&user, &state.config.jwt_refresh_secret)?;
    let jar = jar
        .add(service::access_cookie(access.clone()))
        .add(service::refresh_cookie(refresh));

    Ok((
        jar,
        Json(json!({
            "status": "success",
            "message": "Logged in",
            "accessToken": access,
            "user": UserResponse::from(&user),
        })),
    ))
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .ok_or_else(|| ApiError::Unauthorized("No refresh token".into()))?;

    let claims = service::verify_token(&token, &state.config.jwt_refresh_secret)
        .map_err(|_| ApiError::Forbidden("Invalid refresh token".into()))?;
    let user_id = bson::oid::ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::Forbidden("Invalid refresh token".into()))?;
    let user = queries::find_user_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Account no longer exists".into()))?;

    let access = service::issue_access_token(&user, &state.config.jwt_access_secret)?;
    let jar = jar.add(service::access_cookie(access));

    Ok((
        jar,
        Json(json!({ "status": "success", "message": "Token refreshed" })),
    ))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar
        .add(service::removal_cookie(ACCESS_COOKIE))
        .add(service::removal_cookie(REFRESH_COOKIE));
    (
        jar,
        Json(json!({ "status": "success", "message": "Logged out" })),
    )
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<Value>> {
    validate(&payload)?;

    let user = queries::find_user_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let code = service::generate_reset_code();
    let expires = Utc::now() + Duration::seconds(RESET_CODE_TTL_SECS);
    state
        .db
        .users()
        .update_one(
            doc! { "_id": user.id },
            doc! { "$set": {
                "reset_code": code.as_str(),
                "reset_code_expires": DateTime::from_chrono(expires),
                "updated_at": DateTime::now(),
            }},
        )
        .await?;

    let reset_link = format!(
        "{}/reset-password?email={}&code={}",
        state.config.client_url, user.email, code
    );
    let html = format!(
        "<p>Hello {},</p>\
         <p>Use the link below to reset your password. It expires in 10 minutes.</p>\
         <p><a href=\"{reset_link}\">Reset password</a></p>",
        user.full_name
    );
    if let Err(e) = state
        .mailer
        .send(&user.email, "Password reset", &html)
        .await
    {
        // The code is stored either way; the user can retry the email.
        warn!(error = %e, "failed to send password reset email");
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Password reset email sent",
    })))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    validate(&payload)?;

    let user = queries::find_user_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired reset code".into()))?;

    let valid = matches!(&user.reset_code, Some(code) if *code == payload.code)
        && matches!(user.reset_code_expires, Some(expiry) if expiry > DateTime::now());
    if !valid {
        return Err(ApiError::BadRequest("Invalid or expired reset code".into()));
    }

    let hash = service::hash_password(&payload.new_password)?;
    state
        .db
        .users()
        .update_one(
            doc! { "_id": user.id },
            doc! {
                "$set": { "password": hash, "updated_at": DateTime::now() },
                "$unset": { "reset_code": "", "reset_code_expires": "" },
            },
        )
        .await?;
    info!(user = %user.id, "password reset completed");

    Ok(Json(json!({
        "status": "success",
        "message": "Password has been reset",
    })))
}
