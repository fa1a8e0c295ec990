use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bson::{doc, oid::ObjectId, DateTime, Document};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::auth::middleware::AdminUser;
use crate::database::models::Podcast;
use crate::errors::{validate, ApiError, ApiResult};
use crate::state::AppState;
use crate::utils::{parse_object_id, PageQuery, Pagination};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePodcastRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: String,
    #[validate(url(message = "Invalid YouTube URL"))]
    pub youtube_url: String,
    #[validate(url(message = "Invalid image URL"))]
    pub image_url: String,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Invalid category"))]
    pub category: Option<String>,
    #[validate(range(min = 0, message = "Display order must not be negative"))]
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePodcastRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: Option<String>,
    #[validate(url(message = "Invalid YouTube URL"))]
    pub youtube_url: Option<String>,
    #[validate(url(message = "Invalid image URL"))]
    pub image_url: Option<String>,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Invalid category"))]
    pub category: Option<String>,
    #[validate(range(min = 0, message = "Display order must not be negative"))]
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PodcastResponse {
    pub id: String,
    pub title: String,
    pub youtube_url: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub is_active: bool,
    pub display_order: i64,
    pub created_at: String,
}

impl From<&Podcast> for PodcastResponse {
    fn from(podcast: &Podcast) -> Self {
        Self {
            id: podcast.id.to_hex(),
            title: podcast.title.clone(),
            youtube_url: podcast.youtube_url.clone(),
            image_url: podcast.image_url.clone(),
            description: podcast.description.clone(),
            category: podcast.category.clone(),
            is_active: podcast.is_active,
            display_order: podcast.display_order,
            created_at: podcast.created_at.to_chrono().to_rfc3339(),
        }
    }
}

fn sort_doc(query: &PageQuery) -> Document {
    let direction = query.sort_direction();
    match query.sort_by.as_deref() {
        Some("created_at") => doc! { "created_at": direction },
        Some("title") => doc! { "title": direction },
        _ => doc! { "display_order": 1, "created_at": -1 },
    }
}

async fn paged_podcasts(
    state: &AppState,
    filter: Document,
    query: &PageQuery,
) -> ApiResult<Json<Value>> {
    let page = Pagination::from_query(query);
    let total = state.db.podcasts().count_documents(filter.clone()).await?;
    let podcasts: Vec<Podcast> = state
        .db
        .podcasts()
        .find(filter)
        .sort(sort_doc(query))
        .skip(page.skip())
        .limit(page.limit)
        .await?
        .try_collect()
        .await?;
    let data: Vec<PodcastResponse> = podcasts.iter().map(PodcastResponse::from).collect();

    Ok(Json(json!({
        "status": "success",
        "podcasts": data,
        "pagination": page.info(total),
    })))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let mut filter = doc! { "is_active": true };
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        filter.insert("category", category);
    }
    if let Some(term) = query.search_term() {
        filter.insert("$text", doc! { "$search": term });
    }
    paged_podcasts(&state, filter, &query).await
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let podcast_id = parse_object_id(&id)?;
    let podcast = state
        .db
        .podcasts()
        .find_one(doc! { "_id": podcast_id, "is_active": true })
        .await?
        .ok_or_else(|| ApiError::NotFound("Podcast not found".into()))?;

    Ok(Json(json!({
        "status": "success",
        "podcast": PodcastResponse::from(&podcast),
    })))
}

pub async fn list_all(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let mut filter = Document::new();
    if let Some(is_active) = query.is_active {
        filter.insert("is_active", is_active);
    }
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        filter.insert("category", category);
    }
    if let Some(term) = query.search_term() {
        filter.insert("$text", doc! { "$search": term });
    }
    paged_podcasts(&state, filter, &query).await
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreatePodcastRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate(&payload)?;

    let now = DateTime::now();
    let podcast = Podcast {
        id: ObjectId::new(),
        title: payload.title,
        youtube_url: payload.youtube_url,
        image_url: payload.image_url,
        description: payload.description,
        category: payload.category,
        is_active: payload.is_active.unwrap_or(true),
        display_order: payload.display_order.unwrap_or(0),
        created_by: admin.id,
        created_at: now,
        updated_at: now,
    };
    state.db.podcasts().insert_one(&podcast).await?;
    info!(admin = %admin.id, podcast = %podcast.id, "podcast created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Podcast created",
            "podcast": PodcastResponse::from(&podcast),
        })),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePodcastRequest>,
) -> ApiResult<Json<Value>> {
    validate(&payload)?;

    let podcast_id = parse_object_id(&id)?;
    let mut changes = Document::new();
    if let Some(title) = payload.title {
        changes.insert("title", title);
    }
    if let Some(youtube_url) = payload.youtube_url {
        changes.insert("youtube_url", youtube_url);
    }
    if let Some(image_url) = payload.image_url {
        changes.insert("image_url", image_url);
    }
    if let Some(description) = payload.description {
        changes.insert("description", description);
    }
    if let Some(category) = payload.category {
        changes.insert("category", category);
    }
    if let Some(display_order) = payload.display_order {
        changes.insert("display_order", display_order);
    }
    if let Some(is_active) = payload.is_active {
        changes.insert("is_active", is_active);
    }
    if changes.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".into()));
    }
    changes.insert("updated_at", DateTime::now());

    let result = state
        .db
        .podcasts()
        .update_one(doc! { "_id": podcast_id }, doc! { "$set": changes })
        .await?;
    if result.matched_count == 0 {
        return Err(ApiError::NotFound("Podcast not found".into()));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Podcast updated",
    })))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let podcast_id = parse_object_id(&id)?;
    let result = state
        .db
        .podcasts()
        .delete_one(doc! { "_id": podcast_id })
        .await?;
    if result.deleted_count == 0 {
        return Err(ApiError::NotFound("Podcast not found".into()));
    }
    info!(admin = %admin.id, podcast = %podcast_id, "podcast deleted");

    Ok(Json(json!({
        "status": "success",
        "message": "Podcast deleted",
    })))
}

pub async fn toggle_status(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let podcast_id = parse_object_id(&id)?;
    let podcast = state
        .db
        .podcasts()
        .find_one(doc! { "_id": podcast_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Podcast not found".into()))?;

    let next = !podcast.is_active;
    state
        .db
        .podcasts()
        .update_one(
            doc! { "_id": podcast_id },
            doc! { "$set": { "is_active": next, "updated_at": DateTime::now() } },
        )
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Podcast status updated",
        "is_active": next,
    })))
}
