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

use crate::api::course::handlers::CourseResponse;
use crate::auth::middleware::{AdminUser, AuthUser};
use crate::database::models::{
    BookingStatus, Course, CourseKind, InPersonCourse, InPersonCourseBooking, PaymentMethod,
    PaymentStatus,
};
use crate::database::queries;
use crate::errors::{validate, ApiError, ApiResult};
use crate::services::checkout::{self, session_deadline, CheckoutKind};
use crate::state::AppState;
use crate::utils::parse_object_id;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInPersonCourseRequest {
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
    pub start_date: chrono::DateTime<Utc>,
    pub end_date: chrono::DateTime<Utc>,
    #[validate(length(min = 2, message = "Location is required"))]
    pub location: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInPersonCourseRequest {
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
    pub start_date: Option<chrono::DateTime<Utc>>,
    pub end_date: Option<chrono::DateTime<Utc>>,
    #[validate(length(min = 2, message = "Location is required"))]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub in_person_course_id: String,
    pub payment_method: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub session_id: String,
}

/// Scheduled run combined with its catalog entry.
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub id: String,
    pub start_date: String,
    pub end_date: String,
    pub location: String,
    pub course: CourseResponse,
}

fn schedule_response(schedule: &InPersonCourse, course: &Course) -> ScheduleResponse {
    ScheduleResponse {
        id: schedule.id.to_hex(),
        start_date: schedule.start_date.to_chrono().to_rfc3339(),
        end_date: schedule.end_date.to_chrono().to_rfc3339(),
        location: schedule.location.clone(),
        course: CourseResponse::from(course),
    }
}

async fn find_schedule(
    state: &AppState,
    schedule_id: ObjectId,
) -> ApiResult<(InPersonCourse, Course)> {
    let schedule = state
        .db
        .in_person_courses()
        .find_one(doc! { "_id": schedule_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("In-person course not found".into()))?;
    let course = state
        .db
        .courses()
        .find_one(doc! { "_id": schedule.course_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".into()))?;
    Ok((schedule, course))
}

pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let schedules: Vec<InPersonCourse> = state
        .db
        .in_person_courses()
        .find(doc! {})
        .sort(doc! { "start_date": 1 })
        .await?
        .try_collect()
        .await?;

    let mut data = Vec::with_capacity(schedules.len());
    for schedule in &schedules {
        if let Some(course) = state
            .db
            .courses()
            .find_one(doc! { "_id": schedule.course_id })
            .await?
        {
            data.push(schedule_response(schedule, &course));
        }
    }

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
    let schedule_id = parse_object_id(&id)?;
    let (schedule, course) = find_schedule(&state, schedule_id).await?;

    Ok(Json(json!({
        "status": "success",
        "course": schedule_response(&schedule, &course),
    })))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateInPersonCourseRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate(&payload)?;
    if payload.end_date <= payload.start_date {
        return Err(ApiError::BadRequest("End date must be after start date".into()));
    }

    let now = DateTime::now();
    let course = Course {
        id: ObjectId::new(),
        title: payload.title,
        description: payload.description,
        image: payload.image,
        duration: payload.duration,
        price: payload.price,
        kind: CourseKind::InPerson,
        recorded_course: None,
        created_at: now,
        updated_at: now,
    };
    state.db.courses().insert_one(&course).await?;

    let schedule = InPersonCourse {
        id: ObjectId::new(),
        course_id: course.id,
        start_date: DateTime::from_chrono(payload.start_date),
        end_date: DateTime::from_chrono(payload.end_date),
        location: payload.location,
        created_at: now,
        updated_at: now,
    };
    state.db.in_person_courses().insert_one(&schedule).await?;
    info!(admin = %admin.id, course = %course.id, "in-person course created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "In-person course created",
            "course": schedule_response(&schedule, &course),
        })),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateInPersonCourseRequest>,
) -> ApiResult<Json<Value>> {
    validate(&payload)?;

    let schedule_id = parse_object_id(&id)?;
    let (schedule, course) = find_schedule(&state, schedule_id).await?;

    let mut course_changes = Document::new();
    if let Some(title) = payload.title {
        course_changes.insert("title", title);
    }
    if let Some(description) = payload.description {
        course_changes.insert("description", description);
    }
    if let Some(image) = payload.image {
        course_changes.insert("image", image);
    }
    if let Some(duration) = payload.duration {
        course_changes.insert("duration", duration);
    }
    if let Some(price) = payload.price {
        course_changes.insert("price", price);
    }

    let mut schedule_changes = Document::new();
    if let Some(start_date) = payload.start_date {
        schedule_changes.insert("start_date", DateTime::from_chrono(start_date));
    }
    if let Some(end_date) = payload.end_date {
        schedule_changes.insert("end_date", DateTime::from_chrono(end_date));
    }
    if let Some(location) = payload.location {
        schedule_changes.insert("location", location);
    }

    if course_changes.is_empty() && schedule_changes.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".into()));
    }

    if !course_changes.is_empty() {
        course_changes.insert("updated_at", DateTime::now());
        state
            .db
            .courses()
            .update_one(doc! { "_id": course.id }, doc! { "$set": course_changes })
            .await?;
    }
    if !schedule_changes.is_empty() {
        schedule_changes.insert("updated_at", DateTime::now());
        state
            .db
            .in_person_courses()
            .update_one(doc! { "_id": schedule.id }, doc! { "$set": schedule_changes })
            .await?;
    }

    Ok(Json(json!({
        "status": "success",
        "message": "In-person course updated",
    })))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let schedule_id = parse_object_id(&id)?;
    let (schedule, course) = find_schedule(&state, schedule_id).await?;

    state
        .db
        .in_person_courses()
        .delete_one(doc! { "_id": schedule.id })
        .await?;
    state.db.courses().delete_one(doc! { "_id": course.id }).await?;
    info!(admin = %admin.id, course = %course.id, "in-person course deleted");

    Ok(Json(json!({
        "status": "success",
        "message": "In-person course deleted",
    })))
}

pub async fn checkout_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let schedule_id = parse_object_id(&payload.in_person_course_id)?;
    let (schedule, course) = find_schedule(&state, schedule_id).await?;

    let method = match payload.payment_method.as_str() {
        "stripe" => PaymentMethod::Stripe,
        "cash" => PaymentMethod::Cash,
        "external" => PaymentMethod::External,
        other => {
            return Err(ApiError::BadRequest(format!(
                "Invalid payment method: {other}"
            )))
        }
    };

    let now = DateTime::now();
    let mut booking = InPersonCourseBooking {
        id: ObjectId::new(),
        user_id: user.id,
        course_id: course.id,
        in_person_course_id: schedule.id,
        payment_method: method,
        payment_status: PaymentStatus::Pending,
        status: BookingStatus::Pending,
        session_id: None,
        expires_at: None,
        paid_at: None,
        created_at: now,
        updated_at: now,
    };

    if method != PaymentMethod::Stripe {
        // Offline payment: the booking waits for manual settlement.
        state.db.in_person_course_bookings().insert_one(&booking).await?;
        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "status": "success",
                "message": "Booking created, payment pending",
                "booking_id": booking.id.to_hex(),
            })),
        ));
    }

    let session = checkout::start_session(
        &state,
        CheckoutKind::InPersonCourse {
            user_id: user.id,
            course_id: course.id,
            in_person_course_id: schedule.id,
        },
        course.title.clone(),
        Some(course.description.clone()),
        course.price,
        Some(user.email.clone()),
    )
    .await?;

    booking.session_id = Some(session.id.clone());
    booking.expires_at = Some(session_deadline());
    state.db.in_person_course_bookings().insert_one(&booking).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "session_id": session.id,
            "url": session.url,
        })),
    ))
}

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Json(payload): Json<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    let booking = state
        .db
        .in_person_course_bookings()
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

    queries::confirm_in_person_payment(&state.db, &payload.session_id).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Payment verified",
    })))
}

pub async fn user_bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let bookings: Vec<InPersonCourseBooking> = state
        .db
        .in_person_course_bookings()
        .find(doc! { "user_id": user.id })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    let mut data = Vec::with_capacity(bookings.len());
    for booking in &bookings {
        let course = state
            .db
            .courses()
            .find_one(doc! { "_id": booking.course_id })
            .await?;
        data.push(json!({
            "id": booking.id.to_hex(),
            "status": booking.status,
            "payment_method": booking.payment_method,
            "payment_status": booking.payment_status,
            "created_at": booking.created_at.to_chrono().to_rfc3339(),
            "course": course.as_ref().map(CourseResponse::from),
        }));
    }

    Ok(Json(json!({
        "status": "success",
        "count": data.len(),
        "bookings": data,
    })))
}

/// Cancels pending stripe bookings whose checkout deadline has passed.
/// Consultation bookings are swept too, since an abandoned consultation
/// checkout also holds a slot that has to go back on the market.
pub async fn cleanup_expired(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<Value>> {
    let result = state
        .db
        .in_person_course_bookings()
        .update_many(
            doc! {
                "payment_method": "stripe",
                "payment_status": "pending",
                "status": "pending",
                "expires_at": { "$lt": DateTime::now() },
            },
            doc! { "$set": { "status": "cancelled", "updated_at": DateTime::now() } },
        )
        .await?;
    let consultations = queries::sweep_expired_consultation_checkouts(&state.db).await?;
    info!(
        admin = %admin.id,
        courses = result.modified_count,
        consultations,
        "expired bookings cleaned up"
    );

    Ok(Json(json!({
        "status": "success",
        "cancelled": result.modified_count + consultations,
    })))
}
