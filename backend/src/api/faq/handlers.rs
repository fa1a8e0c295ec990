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
use crate::database::models::Faq;
use crate::errors::{validate, ApiError, ApiResult};
use crate::state::AppState;
use crate::utils::{parse_object_id, PageQuery, Pagination};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFaqRequest {
    #[validate(length(min = 3, max = 500, message = "Question must be 3-500 characters"))]
    pub question: String,
    #[validate(length(min = 10, max = 2000, message = "Answer must be 10-2000 characters"))]
    pub answer: String,
    #[validate(range(min = 0, message = "Display order must not be negative"))]
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFaqRequest {
    #[validate(length(min = 3, max = 500, message = "Question must be 3-500 characters"))]
    pub question: Option<String>,
    #[validate(length(min = 10, max = 2000, message = "Answer must be 10-2000 characters"))]
    pub answer: Option<String>,
    #[validate(range(min = 0, message = "Display order must not be negative"))]
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct FaqResponse {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub is_active: bool,
    pub display_order: i64,
    pub created_at: String,
}

impl From<&Faq> for FaqResponse {
    fn from(faq: &Faq) -> Self {
        Self {
            id: faq.id.to_hex(),
            question: faq.question.clone(),
            answer: faq.answer.clone(),
            is_active: faq.is_active,
            display_order: faq.display_order,
            created_at: faq.created_at.to_chrono().to_rfc3339(),
        }
    }
}

fn sort_doc(query: &PageQuery) -> Document {
    let direction = query.sort_direction();
    match query.sort_by.as_deref() {
        Some("created_at") => doc! { "created_at": direction },
        Some("question") => doc! { "question": direction },
        // Ordering by display_order is the default public presentation.
        _ => doc! { "display_order": 1, "created_at": -1 },
    }
}

async fn paged_faqs(
    state: &AppState,
    filter: Document,
    query: &PageQuery,
) -> ApiResult<Json<Value>> {
    let page = Pagination::from_query(query);
    let total = state.db.faqs().count_documents(filter.clone()).await?;
    let faqs: Vec<Faq> = state
        .db
        .faqs()
        .find(filter)
        .sort(sort_doc(query))
        .skip(page.skip())
        .limit(page.limit)
        .await?
        .try_collect()
        .await?;
    let data: Vec<FaqResponse> = faqs.iter().map(FaqResponse::from).collect();

    Ok(Json(json!({
        "status": "success",
        "faqs": data,
        "pagination": page.info(total),
    })))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let mut filter = doc! { "is_active": true };
    if let Some(term) = query.search_term() {
        filter.insert("$text", doc! { "$search": term });
    }
    paged_faqs(&state, filter, &query).await
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
    if let Some(term) = query.search_term() {
        filter.insert("$text", doc! { "$search": term });
    }
    paged_faqs(&state, filter, &query).await
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateFaqRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate(&payload)?;

    let now = DateTime::now();
    let faq = Faq {
        id: ObjectId::new(),
        question: payload.question,
        answer: payload.answer,
        is_active: payload.is_active.unwrap_or(true),
        display_order: payload.display_order.unwrap_or(0),
        created_by: admin.id,
        created_at: now,
        updated_at: now,
    };
    state.db.faqs().insert_one(&faq).await?;
    info!(admin = %admin.id, faq = %faq.id, "faq created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "FAQ created",
            "faq": FaqResponse::from(&faq),
        })),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateFaqRequest>,
) -> ApiResult<Json<Value>> {
    validate(&payload)?;

    let faq_id = parse_object_id(&id)?;
    let mut changes = Document::new();
    if let Some(question) = payload.question {
        changes.insert("question", question);
    }
    if let Some(answer) = payload.answer {
        changes.insert("answer", answer);
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
        .faqs()
        .update_one(doc! { "_id": faq_id }, doc! { "$set": changes })
        .await?;
    if result.matched_count == 0 {
        return Err(ApiError::NotFound("FAQ not found".into()));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "FAQ updated",
    })))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let faq_id = parse_object_id(&id)?;
    let result = state.db.faqs().delete_one(doc! { "_id": faq_id }).await?;
    if result.deleted_count == 0 {
        return Err(ApiError::NotFound("FAQ not found".into()));
    }
    info!(admin = %admin.id, faq = %faq_id, "faq deleted");

    Ok(Json(json!({
        "status": "success",
        "message": "FAQ deleted",
    })))
}

pub async fn toggle_status(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let faq_id = parse_object_id(&id)?;
    let faq = state
        .db
        .faqs()
        .find_one(doc! { "_id": faq_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("FAQ not found".into()))?;

    let next = !faq.is_active;
    state
        .db
        .faqs()
        .update_one(
            doc! { "_id": faq_id },
            doc! { "$set": { "is_active": next, "updated_at": DateTime::now() } },
        )
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "FAQ status updated",
        "is_active": next,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_faq_bounds() {
        let ok = CreateFaqRequest {
            question: "How do bookings work?".into(),
            answer: "Pick a slot, pay, and you are confirmed.".into(),
            display_order: Some(2),
            is_active: None,
        };
        assert!(ok.validate().is_ok());

        let bad = CreateFaqRequest {
            question: "ab".into(),
            answer: "too short".into(),
            display_order: Some(-1),
            is_active: None,
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("question"));
        assert!(errors.field_errors().contains_key("answer"));
        assert!(errors.field_errors().contains_key("display_order"));
    }

    #[test]
    fn default_sort_is_display_order() {
        let query = PageQuery::default();
        assert_eq!(sort_doc(&query), doc! { "display_order": 1, "created_at": -1 });

        let query = PageQuery {
            sort_by: Some("created_at".into()),
            order: Some("asc".into()),
            ..Default::default()
        };
        assert_eq!(sort_doc(&query), doc! { "created_at": 1 });
    }
}
