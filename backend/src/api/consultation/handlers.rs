use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bson::{doc, oid::ObjectId, DateTime};
use chrono::Utc;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::middleware::{AdminUser, AuthUser};
use crate::database::models::{
    BookingStatus, Consultation, ConsultationBooking, ConsultationStatus, PaymentMethod,
    PaymentStatus,
};
use crate::database::queries;
use crate::errors::{validate, ApiError, ApiResult};
use crate::services::checkout::{self, session_deadline, CheckoutKind};
use crate::state::AppState;
use crate::utils::parse_object_id;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateConsultationRequest {
    #[validate(length(min = 2, max = 100, message = "Consultation type is required"))]
    pub consultation_type: String,
    pub scheduled_at: chrono::DateTime<Utc>,
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: i64,
}

#[derive(Debug, Deserialize)]
pub struct OfflineBookRequest {
    pub payment_method: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub consultation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub session_id: String,
    pub consultation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConsultationResponse {
    pub id: String,
    pub consultation_type: String,
    pub scheduled_at: String,
    pub price: i64,
    pub status: ConsultationStatus,
}

impl From<&Consultation> for ConsultationResponse {
    fn from(slot: &Consultation) -> Self {
        Self {
            id: slot.id.to_hex(),
            consultation_type: slot.consultation_type.clone(),
            scheduled_at: slot.scheduled_at.to_chrono().to_rfc3339(),
            price: slot.price,
            status: slot.status,
        }
    }
}

fn parse_offline_method(raw: &str) -> Result<PaymentMethod, ApiError> {
    match raw {
        "cash" => Ok(PaymentMethod::Cash),
        "external" => Ok(PaymentMethod::External),
        other => Err(ApiError::BadRequest(format!(
            "Offline booking accepts cash or external, got: {other}"
        ))),
    }
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateConsultationRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate(&payload)?;

    let scheduled_at = DateTime::from_chrono(payload.scheduled_at);
    let duplicate = state
        .db
        .consultations()
        .find_one(doc! { "scheduled_at": scheduled_at })
        .await?;
    if duplicate.is_some() {
        return Err(ApiError::Conflict(
            "A consultation already exists at that time".into(),
        ));
    }

    let now = DateTime::now();
    let slot = Consultation {
        id: ObjectId::new(),
        consultation_type: payload.consultation_type,
        scheduled_at,
        price: payload.price,
        status: ConsultationStatus::Available,
        user_id: None,
        payment_method: None,
        payment_status: None,
        booked_at: None,
        created_at: now,
        updated_at: now,
    };
    state.db.consultations().insert_one(&slot).await?;
    info!(admin = %admin.id, slot = %slot.id, "consultation slot created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Consultation created",
            "consultation": ConsultationResponse::from(&slot),
        })),
    ))
}

pub async fn available(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<Json<Value>> {
    let slots: Vec<Consultation> = state
        .db
        .consultations()
        .find(doc! { "status": "available" })
        .sort(doc! { "scheduled_at": 1 })
        .await?
        .try_collect()
        .await?;
    let data: Vec<ConsultationResponse> = slots.iter().map(ConsultationResponse::from).collect();

    Ok(Json(json!({
        "status": "success",
        "count": data.len(),
        "consultations": data,
    })))
}

/// Books a slot for offline settlement; no checkout session involved.
pub async fn book_offline(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<OfflineBookRequest>,
) -> ApiResult<Json<Value>> {
    let slot_id = parse_object_id(&id)?;
    let method = parse_offline_method(&payload.payment_method)?;

    let slot = queries::claim_consultation_slot(&state.db, slot_id, user.id, method)
        .await?
        .ok_or_else(|| ApiError::Conflict("Consultation is not available".into()))?;

    let now = DateTime::now();
    let booking = ConsultationBooking {
        id: ObjectId::new(),
        user_id: user.id,
        consultation_id: slot.id,
        payment_method: method,
        payment_status: PaymentStatus::Pending,
        status: BookingStatus::Pending,
        session_id: None,
        expires_at: None,
        paid_at: None,
        created_at: now,
        updated_at: now,
    };
    state.db.consultation_bookings().insert_one(&booking).await?;
    info!(user = %user.id, slot = %slot.id, "consultation booked offline");

    Ok(Json(json!({
        "status": "success",
        "message": "Consultation booked, payment pending",
        "booking_id": booking.id.to_hex(),
    })))
}

pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> ApiResult<Json<Value>> {
    let slot_id = parse_object_id(&payload.consultation_id)?;
    let slot = state
        .db
        .consultations()
        .find_one(doc! { "_id": slot_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Consultation not found".into()))?;

    if slot.status != ConsultationStatus::Available {
        return Err(ApiError::Conflict("Consultation is not available".into()));
    }
    if slot.price <= 0 {
        return Err(ApiError::BadRequest("Consultation has no payable price".into()));
    }

    // Claim the slot before opening the session so two users cannot pay for
    // the same time.
    queries::claim_consultation_slot(&state.db, slot.id, user.id, PaymentMethod::Stripe)
        .await?
        .ok_or_else(|| ApiError::Conflict("Consultation is not available".into()))?;

    let session = match checkout::start_session(
        &state,
        CheckoutKind::Consultation {
            user_id: user.id,
            consultation_id: slot.id,
        },
        format!("Consultation: {}", slot.consultation_type),
        None,
        slot.price,
        Some(user.email.clone()),
    )
    .await
    {
        Ok(session) => session,
        Err(e) => {
            warn!(slot = %slot.id, error = %e, "checkout session failed, releasing slot");
            queries::release_consultation_slot(&state.db, slot.id).await?;
            return Err(e);
        }
    };

    let now = DateTime::now();
    let booking = ConsultationBooking {
        id: ObjectId::new(),
        user_id: user.id,
        consultation_id: slot.id,
        payment_method: PaymentMethod::Stripe,
        payment_status: PaymentStatus::Pending,
        status: BookingStatus::Pending,
        session_id: Some(session.id.clone()),
        expires_at: Some(session_deadline()),
        paid_at: None,
        created_at: now,
        updated_at: now,
    };
    state.db.consultation_bookings().insert_one(&booking).await?;

    Ok(Json(json!({
        "status": "success",
        "session_id": session.id,
        "url": session.url,
    })))
}

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<Json<Value>> {
    let slot_id = parse_object_id(&query.consultation_id)?;
    let booking = state
        .db
        .consultation_bookings()
        .find_one(doc! { "session_id": query.session_id.as_str() })
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;

    if booking.consultation_id != slot_id {
        return Err(ApiError::BadRequest(
            "Session does not belong to that consultation".into(),
        ));
    }

    if booking.payment_status == PaymentStatus::Paid {
        return Ok(Json(json!({
            "status": "success",
            "payment_status": "paid",
            "message": "Payment already verified",
        })));
    }

    let session = state
        .payments
        .retrieve_checkout_session(&query.session_id)
        .await?;

    match checkout::resolve_pending(session.is_paid(), booking.expires_at) {
        checkout::PendingOutcome::Settle => {
            queries::confirm_consultation_payment(&state.db, &query.session_id).await?;
            Ok(Json(json!({
                "status": "success",
                "payment_status": "paid",
                "message": "Payment verified",
            })))
        }
        checkout::PendingOutcome::Abandon => {
            queries::abandon_consultation_checkout(&state.db, &query.session_id).await?;
            info!(session = %query.session_id, "abandoned checkout, slot released");
            Ok(Json(json!({
                "status": "success",
                "payment_status": "expired",
                "message": "Checkout session expired, the slot is available again",
            })))
        }
        checkout::PendingOutcome::Wait => Ok(Json(json!({
            "status": "success",
            "payment_status": "pending",
            "message": "Payment not completed yet",
        }))),
    }
}

async fn booking_entry(
    state: &AppState,
    booking: &ConsultationBooking,
    include_user: bool,
) -> ApiResult<Value> {
    let slot = state
        .db
        .consultations()
        .find_one(doc! { "_id": booking.consultation_id })
        .await?;

    let mut entry = json!({
        "id": booking.id.to_hex(),
        "status": booking.status,
        "payment_method": booking.payment_method,
        "payment_status": booking.payment_status,
        "created_at": booking.created_at.to_chrono().to_rfc3339(),
        "consultation": slot.as_ref().map(ConsultationResponse::from),
    });
    if include_user {
        let user = queries::find_user_by_id(&state.db, booking.user_id).await;
        // Admin listing tolerates deleted accounts.
        let summary = match user {
            Ok(Some(user)) => json!({
                "id": user.id.to_hex(),
                "full_name": user.full_name,
                "email": user.email,
            }),
            _ => Value::Null,
        };
        entry["user"] = summary;
    }
    Ok(entry)
}

pub async fn payments_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let bookings: Vec<ConsultationBooking> = state
        .db
        .consultation_bookings()
        .find(doc! { "user_id": user.id })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    let mut data = Vec::with_capacity(bookings.len());
    for booking in &bookings {
        data.push(booking_entry(&state, booking, false).await?);
    }

    Ok(Json(json!({
        "status": "success",
        "count": data.len(),
        "payments": data,
    })))
}

pub async fn all_payments(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> ApiResult<Json<Value>> {
    let bookings: Vec<ConsultationBooking> = state
        .db
        .consultation_bookings()
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    let mut data = Vec::with_capacity(bookings.len());
    for booking in &bookings {
        data.push(booking_entry(&state, booking, true).await?);
    }

    Ok(Json(json!({
        "status": "success",
        "count": data.len(),
        "payments": data,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_query_requires_both_identifiers() {
        let query: VerifyQuery = serde_json::from_value(json!({
            "session_id": "cs_test_123",
            "consultation_id": ObjectId::new().to_hex(),
        }))
        .unwrap();
        assert_eq!(query.session_id, "cs_test_123");

        let missing = serde_json::from_value::<VerifyQuery>(json!({
            "session_id": "cs_test_123",
        }));
        assert!(missing.is_err());
    }

    #[test]
    fn offline_method_accepts_cash_and_external_only() {
        assert_eq!(parse_offline_method("cash").unwrap(), PaymentMethod::Cash);
        assert_eq!(
            parse_offline_method("external").unwrap(),
            PaymentMethod::External
        );
        assert!(parse_offline_method("stripe").is_err());
        assert!(parse_offline_method("card").is_err());
    }
}
