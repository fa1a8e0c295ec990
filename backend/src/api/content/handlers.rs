use std::sync::Arc;

use axum::{extract::State, Json};
use bson::doc;
use futures::TryStreamExt;
use serde_json::{json, Value};

use crate::api::course::handlers::CourseResponse;
use crate::auth::middleware::AuthUser;
use crate::database::models::{
    ConsultationBooking, InPersonCourseBooking, RecordedCourseBooking,
};
use crate::errors::ApiResult;
use crate::state::AppState;

/// Everything the caller has paid for, across all three purchasable kinds,
/// in one list with per-kind counts.
pub async fn user_content(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let mut items: Vec<Value> = Vec::new();

    let recorded: Vec<RecordedCourseBooking> = state
        .db
        .recorded_course_bookings()
        .find(doc! { "user_id": user.id, "payment_status": "paid" })
        .sort(doc! { "paid_at": -1 })
        .await?
        .try_collect()
        .await?;
    for booking in &recorded {
        let course = state
            .db
            .courses()
            .find_one(doc! { "_id": booking.course_id })
            .await?;
        let files = state
            .db
            .recorded_courses()
            .find_one(doc! { "_id": booking.recorded_course_id })
            .await?
            .map(|rc| rc.files)
            .unwrap_or_default();
        items.push(json!({
            "kind": "recorded_course",
            "purchased_at": booking.paid_at.map(|d| d.to_chrono().to_rfc3339()),
            "course": course.as_ref().map(CourseResponse::from),
            "files": files,
        }));
    }

    let in_person: Vec<InPersonCourseBooking> = state
        .db
        .in_person_course_bookings()
        .find(doc! { "user_id": user.id, "payment_status": "paid" })
        .sort(doc! { "paid_at": -1 })
        .await?
        .try_collect()
        .await?;
    for booking in &in_person {
        let course = state
            .db
            .courses()
            .find_one(doc! { "_id": booking.course_id })
            .await?;
        let schedule = state
            .db
            .in_person_courses()
            .find_one(doc! { "_id": booking.in_person_course_id })
            .await?;
        items.push(json!({
            "kind": "in_person_course",
            "purchased_at": booking.paid_at.map(|d| d.to_chrono().to_rfc3339()),
            "course": course.as_ref().map(CourseResponse::from),
            "schedule": schedule.map(|s| json!({
                "start_date": s.start_date.to_chrono().to_rfc3339(),
                "end_date": s.end_date.to_chrono().to_rfc3339(),
                "location": s.location,
            })),
        }));
    }

    let consultations: Vec<ConsultationBooking> = state
        .db
        .consultation_bookings()
        .find(doc! { "user_id": user.id, "payment_status": "paid" })
        .sort(doc! { "paid_at": -1 })
        .await?
        .try_collect()
        .await?;
    for booking in &consultations {
        let slot = state
            .db
            .consultations()
            .find_one(doc! { "_id": booking.consultation_id })
            .await?;
        items.push(json!({
            "kind": "consultation",
            "purchased_at": booking.paid_at.map(|d| d.to_chrono().to_rfc3339()),
            "consultation": slot.map(|s| json!({
                "consultation_type": s.consultation_type,
                "scheduled_at": s.scheduled_at.to_chrono().to_rfc3339(),
            })),
        }));
    }

    Ok(Json(json!({
        "status": "success",
        "stats": {
            "total_items": items.len(),
            "recorded_courses": recorded.len(),
            "in_person_courses": in_person.len(),
            "consultations": consultations.len(),
        },
        "items": items,
    })))
}
