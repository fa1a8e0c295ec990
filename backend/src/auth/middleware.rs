//! Request extractors that gate handlers on a valid session cookie.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use bson::oid::ObjectId;

use crate::auth::service::{self, ACCESS_COOKIE};
use crate::database::{models::User, queries};
use crate::errors::ApiError;
use crate::state::AppState;

/// Extractor for any authenticated user.
pub struct AuthUser(pub User);

/// Extractor that additionally requires the admin role.
pub struct AdminUser(pub User);

async fn authenticate(parts: &Parts, state: &Arc<AppState>) -> Result<User, ApiError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar
        .get(ACCESS_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;

    let claims = service::verify_token(&token, &state.config.jwt_access_secret)?;
    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

    queries::find_user_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".into()))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        Ok(AuthUser(user))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
