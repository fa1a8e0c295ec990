use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bson::{doc, oid::ObjectId, DateTime, Document};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::api::course::handlers::CourseResponse;
use crate::auth::middleware::{AdminUser, AuthUser};
use crate::database::models::{
    Course, CourseFile, CourseKind, PaymentStatus, RecordedCourse, RecordedCourseBooking,
};
use crate::database::queries;
use crate::errors::{validate, ApiError, ApiResult};
use crate::services::checkout::{self, CheckoutKind};
use crate::state::AppState;
use crate::utils::parse_object_id;

#[derive(Debug, Deserialize, Validate)]
pub struct CourseFilePayload {
    #[validate(length(min = 1, message = "File name is required"))]
    pub file_name: String,
    #[validate(url(message = "Invalid file URL"))]
    pub file_url: String,
    #[validate(length(min = 1, message = "File type is required"))]
    pub file_type: String,
}

impl From<CourseFilePayload> for CourseFile {
    fn from(payload: CourseFilePayload) -> Self {
        CourseFile {
            file_name: payload.file_name,
            file_url: payload.file_url,
            file_type: payload.file_type,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecordedCourseRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,
    #[validate(url(message = "Invalid image URL"))]
    pub image: String,
    #[validate(range(min = 1, message = "Duration must be positive"))]
    pub duration: i64,
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: i64,
    #[validate(nested)]
    pub files: Vec<CourseFilePayload>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRecordedCourseRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: Option<String>,
    #[validate(url(message = "Invalid image URL"))]
    pub image: Option<String>,
    #[validate(range(min = 1, message = "Duration must be positive"))]
    pub duration: Option<i64>,
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: Option<i64>,
    #[validate(nested)]
    pub files: Option<Vec<CourseFilePayload>>,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub course_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub session_id: String,
}

async fn find_recorded_course(
    state: &AppState,
    course_id: ObjectId,
) -> ApiResult<(Course, RecordedCourse)> {
    let course = state
        .db
        .courses()
        .find_one(doc! { "_id": course_id, "kind": "recorded" })
        .await?
        .ok_or_else(|| ApiError::NotFound("Recorded course not found".into()))?;
    let recorded_id = course
        .recorded_course
        .ok_or_else(|| ApiError::Internal("Recorded course has no content document".into()))?;
    let recorded = state
        .db
        .recorded_courses()
        .find_one(doc! { "_id": recorded_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Recorded course content not found".into()))?;
    Ok((course, recorded))
}

pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let courses: Vec<Course> = state
        .db
        .courses()
        .find(doc! { "kind": "recorded" })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;
    let data: Vec<CourseResponse> = courses.iter().map(CourseResponse::from).collect();

    Ok(Json(json!({
        "status": "success",
        "count": data.len(),
        "courses": data,
    })))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let course_id = parse_object_id(&id)?;
    let (course, recorded) = find_recorded_course(&state, course_id).await?;

    Ok(Json(json!({
        "status": "success",
        "course": CourseResponse::from(&course),
        "files": recorded.files,
    })))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateRecordedCourseRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate(&payload)?;

    let now = DateTime::now();
    let recorded = RecordedCourse {
        id: ObjectId::new(),
        files: payload.files.into_iter().map(CourseFile::from).collect(),
        created_at: now,
        updated_at: now,
    };
    state.db.recorded_courses().insert_one(&recorded).await?;

    let course = Course {
        id: ObjectId::new(),
        title: payload.title,
        description: payload.description,
        image: payload.image,
        duration: payload.duration,
        price: payload.price,
        kind: CourseKind::Recorded,
        recorded_course: Some(recorded.id),
        created_at: now,
        updated_at: now,
    };
    state.db.courses().insert_one(&course).await?;
    info!(admin = %admin.id, course = %course.id, "recorded course created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Recorded course created",
            "course": CourseResponse::from(&course),
        })),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRecordedCourseRequest>,
) -> ApiResult<Json<Value>> {
    validate(&payload)?;

    let course_id = parse_object_id(&id)?;
    let (course, recorded) = find_recorded_course(&state, course_id).await?;

    let mut changes = Document::new();
    if let Some(title) = payload.title {
        changes.insert("title", title);
    }
    if let Some(description) = payload.description {
        changes.insert("description", description);
    }
    if let Some(image) = payload.image {
        changes.insert("image", image);
    }
    if let Some(duration) = payload.duration {
        changes.insert("duration", duration);
    }
    if let Some(price) = payload.price {
        changes.insert("price", price);
    }

    if changes.is_empty() && payload.files.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".into()));
    }

    if !changes.is_empty() {
        changes.insert("updated_at", DateTime::now());
        state
            .db
            .courses()
            .update_one(doc! { "_id": course.id }, doc! { "$set": changes })
            .await?;
    }

    if let Some(files) = payload.files {
        let files: Vec<CourseFile> = files.into_iter().map(CourseFile::from).collect();
        let files = bson::to_bson(&files)
            .map_err(|e| ApiError::Internal(format!("file list serialization failed: {e}")))?;
        state
            .db
            .recorded_courses()
            .update_one(
                doc! { "_id": recorded.id },
                doc! { "$set": { "files": files, "updated_at": DateTime::now() } },
            )
            .await?;
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Recorded course updated",
    })))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let course_id = parse_object_id(&id)?;
    let (course, recorded) = find_recorded_course(&state, course_id).await?;

    state
        .db
        .recorded_courses()
        .delete_one(doc! { "_id": recorded.id })
        .await?;
    state.db.courses().delete_one(doc! { "_id": course.id }).await?;
    info!(admin = %admin.id, course = %course.id, "recorded course deleted");

    Ok(Json(json!({
        "status": "success",
        "message": "Recorded course deleted",
    })))
}

pub async fn book(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<BookRequest>,
) -> ApiResult<Json<Value>> {
    let course_id = parse_object_id(&payload.course_id)?;
    let (course, recorded) = find_recorded_course(&state, course_id).await?;

    if queries::user_owns_recorded_course(&state.db, user.id, course.id).await? {
        return Err(ApiError::Conflict("Course already purchased".into()));
    }

    let session = checkout::start_session(
        &state,
        CheckoutKind::RecordedCourse {
            user_id: user.id,
            course_id: course.id,
            recorded_course_id: recorded.id,
        },
        course.title.clone(),
        Some(course.description.clone()),
        course.price,
        Some(user.email.clone()),
    )
    .await?;

    let now = DateTime::now();
    let booking = RecordedCourseBooking {
        id: ObjectId::new(),
        user_id: user.id,
        course_id: course.id,
        recorded_course_id: recorded.id,
        payment_status: PaymentStatus::Pending,
        session_id: Some(session.id.clone()),
        paid_at: None,
        created_at: now,
        updated_at: now,
    };
    state.db.recorded_course_bookings().insert_one(&booking).await?;

    Ok(Json(json!({
        "status": "success",
        "session_id": session.id,
        "url": session.url,
    })))
}

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Json(payload): Json<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    let booking = state
        .db
        .recorded_course_bookings()
        .find_one(doc! { "session_id": payload.session_id.as_str() })
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;

    if booking.payment_status == PaymentStatus::Paid {
        return Ok(Json(json!({
            "status": "success",
            "message": "Payment already verified",
        })));
    }

    let session = state
        .payments
        .retrieve_checkout_session(&payload.session_id)
        .await?;
    if !session.is_paid() {
        return Err(ApiError::BadRequest("Payment not completed".into()));
    }

    queries::confirm_recorded_payment(&state.db, &payload.session_id).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Payment verified",
    })))
}
