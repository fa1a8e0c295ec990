use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bson::{doc, oid::ObjectId, DateTime, Document};
use chrono::Utc;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::auth::middleware::{AdminUser, AuthUser};
use crate::database::models::{Event, EventKind};
use crate::database::queries;
use crate::errors::{validate, ApiError, ApiResult};
use crate::services::checkout::{self, CheckoutKind};
use crate::state::AppState;
use crate::utils::parse_object_id;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 3, max = 200, message = "Name must be 3-200 characters"))]
    pub name: String,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,
    pub date: chrono::DateTime<Utc>,
    #[validate(length(min = 2, message = "Location is required"))]
    pub location: String,
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: i64,
    pub kind: EventKind,
    #[validate(range(min = 1, message = "Seats must be positive"))]
    pub seats: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 3, max = 200, message = "Name must be 3-200 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: Option<String>,
    pub date: Option<chrono::DateTime<Utc>>,
    #[validate(length(min = 2, message = "Location is required"))]
    pub location: Option<String>,
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: Option<i64>,
    #[validate(range(min = 1, message = "Seats must be positive"))]
    pub seats: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub project_name: Option<String>,
    pub project_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub price: i64,
    pub kind: EventKind,
    pub seats: i64,
}

impl From<&Event> for EventResponse {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.to_hex(),
            name: event.name.clone(),
            description: event.description.clone(),
            date: event.date.to_chrono().to_rfc3339(),
            location: event.location.clone(),
            price: event.price,
            kind: event.kind,
            seats: event.seats,
        }
    }
}

pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let events: Vec<Event> = state
        .db
        .events()
        .find(doc! {})
        .sort(doc! { "date": 1 })
        .await?
        .try_collect()
        .await?;
    let data: Vec<EventResponse> = events.iter().map(EventResponse::from).collect();

    Ok(Json(json!({
        "status": "success",
        "count": data.len(),
        "events": data,
    })))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let event_id = parse_object_id(&id)?;
    let event = state
        .db
        .events()
        .find_one(doc! { "_id": event_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;

    let taken = queries::event_registration_count(&state.db, event.id).await?;

    Ok(Json(json!({
        "status": "success",
        "event": EventResponse::from(&event),
        "seats_taken": taken,
    })))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate(&payload)?;

    let event = Event {
        id: ObjectId::new(),
        name: payload.name,
        description: payload.description,
        date: DateTime::from_chrono(payload.date),
        location: payload.location,
        price: payload.price,
        kind: payload.kind,
        seats: payload.seats,
    };
    state.db.events().insert_one(&event).await?;
    info!(admin = %admin.id, event = %event.id, "event created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Event created",
            "event": EventResponse::from(&event),
        })),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateEventRequest>,
) -> ApiResult<Json<Value>> {
    validate(&payload)?;

    let event_id = parse_object_id(&id)?;
    let mut changes = Document::new();
    if let Some(name) = payload.name {
        changes.insert("name", name);
    }
    if let Some(description) = payload.description {
        changes.insert("description", description);
    }
    if let Some(date) = payload.date {
        changes.insert("date", DateTime::from_chrono(date));
    }
    if let Some(location) = payload.location {
        changes.insert("location", location);
    }
    if let Some(price) = payload.price {
        changes.insert("price", price);
    }
    if let Some(seats) = payload.seats {
        changes.insert("seats", seats);
    }
    if changes.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".into()));
    }

    let result = state
        .db
        .events()
        .update_one(doc! { "_id": event_id }, doc! { "$set": changes })
        .await?;
    if result.matched_count == 0 {
        return Err(ApiError::NotFound("Event not found".into()));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Event updated",
    })))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let event_id = parse_object_id(&id)?;
    let result = state.db.events().delete_one(doc! { "_id": event_id }).await?;
    if result.deleted_count == 0 {
        return Err(ApiError::NotFound("Event not found".into()));
    }
    info!(admin = %admin.id, event = %event_id, "event deleted");

    Ok(Json(json!({
        "status": "success",
        "message": "Event deleted",
    })))
}

/// Opens a checkout session for an event seat. The registration row itself
/// is only written by the payment webhook, so the checks here run again
/// there.
pub async fn register(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<Value>> {
    let event_id = parse_object_id(&id)?;
    let event = state
        .db
        .events()
        .find_one(doc! { "_id": event_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;

    if queries::user_registered_for_event(&state.db, user.id, event.id).await? {
        return Err(ApiError::BadRequest("Already registered for this event".into()));
    }
    let taken = queries::event_registration_count(&state.db, event.id).await?;
    if taken as i64 >= event.seats {
        return Err(ApiError::BadRequest("Event is fully booked".into()));
    }

    if event.kind == EventKind::CoffeeMeet
        && (payload.project_name.as_deref().unwrap_or("").is_empty()
            || payload.project_link.as_deref().unwrap_or("").is_empty())
    {
        return Err(ApiError::BadRequest(
            "Coffee meet registration requires project name and link".into(),
        ));
    }

    let session = checkout::start_session(
        &state,
        CheckoutKind::EventRegistration {
            user_id: user.id,
            event_id: event.id,
            project_name: payload.project_name,
            project_link: payload.project_link,
        },
        event.name.clone(),
        Some(event.description.clone()),
        event.price,
        Some(user.email.clone()),
    )
    .await?;

    Ok(Json(json!({
        "status": "success",
        "session_id": session.id,
        "url": session.url,
    })))
}
