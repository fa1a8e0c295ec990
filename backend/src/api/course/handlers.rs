use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use bson::doc;
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::{json, Value};

use crate::database::models::{Course, CourseKind};
use crate::errors::{ApiError, ApiResult};
use crate::state::AppState;
use crate::utils::parse_object_id;

/// Catalog entry as returned to clients.
#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub duration: i64,
    pub price: i64,
    pub kind: CourseKind,
    pub created_at: String,
}

impl From<&Course> for CourseResponse {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.to_hex(),
            title: course.title.clone(),
            description: course.description.clone(),
            image: course.image.clone(),
            duration: course.duration,
            price: course.price,
            kind: course.kind,
            created_at: course.created_at.to_chrono().to_rfc3339(),
        }
    }
}

pub async fn list_courses(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let courses: Vec<Course> = state
        .db
        .courses()
        .find(doc! {})
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

pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let course_id = parse_object_id(&id)?;
    let course = state
        .db
        .courses()
        .find_one(doc! { "_id": course_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".into()))?;

    Ok(Json(json!({
        "status": "success",
        "course": CourseResponse::from(&course),
    })))
}
