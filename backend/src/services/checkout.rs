//! Booking/payment lifecycle shared by every paid feature.
//!
//! A purchase starts as a `pending` booking tied to a hosted checkout
//! session and reaches `paid`/`confirmed` either through client-polled
//! verification or through the payment webhook. Session metadata carries a
//! typed [`CheckoutKind`] so the webhook can tell which feature a session
//! belongs to; that parse happens in exactly one place, here.

use std::collections::HashMap;
use std::sync::Arc;

use adapters::models::{CheckoutSession, CheckoutSessionRequest};
use bson::{oid::ObjectId, DateTime};
use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::database::models::EventRegistration;
use crate::database::queries;
use crate::errors::{ApiError, ApiResult};
use crate::state::AppState;

/// Hosted checkout sessions expire after this long; matching pending
/// bookings carry the same deadline in `expires_at`.
pub const CHECKOUT_TTL_SECS: i64 = 30 * 60;

const KIND_KEY: &str = "kind";

/// Which feature a checkout session pays for, encoded into and decoded from
/// provider session metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutKind {
    Consultation {
        user_id: ObjectId,
        consultation_id: ObjectId,
    },
    InPersonCourse {
        user_id: ObjectId,
        course_id: ObjectId,
        in_person_course_id: ObjectId,
    },
    RecordedCourse {
        user_id: ObjectId,
        course_id: ObjectId,
        recorded_course_id: ObjectId,
    },
    EventRegistration {
        user_id: ObjectId,
        event_id: ObjectId,
        project_name: Option<String>,
        project_link: Option<String>,
    },
}

impl CheckoutKind {
    pub fn into_metadata(self) -> HashMap<String, String> {
        let mut meta = HashMap::new();
        match self {
            CheckoutKind::Consultation {
                user_id,
                consultation_id,
            } => {
                meta.insert(KIND_KEY.into(), "consultation".into());
                meta.insert("user".into(), user_id.to_hex());
                meta.insert("consultation".into(), consultation_id.to_hex());
            }
            CheckoutKind::InPersonCourse {
                user_id,
                course_id,
                in_person_course_id,
            } => {
                meta.insert(KIND_KEY.into(), "in_person_course".into());
                meta.insert("user".into(), user_id.to_hex());
                meta.insert("course".into(), course_id.to_hex());
                meta.insert("in_person_course".into(), in_person_course_id.to_hex());
            }
            CheckoutKind::RecordedCourse {
                user_id,
                course_id,
                recorded_course_id,
            } => {
                meta.insert(KIND_KEY.into(), "recorded_course".into());
                meta.insert("user".into(), user_id.to_hex());
                meta.insert("course".into(), course_id.to_hex());
                meta.insert("recorded_course".into(), recorded_course_id.to_hex());
            }
            CheckoutKind::EventRegistration {
                user_id,
                event_id,
                project_name,
                project_link,
            } => {
                meta.insert(KIND_KEY.into(), "event_registration".into());
                meta.insert("user".into(), user_id.to_hex());
                meta.insert("event".into(), event_id.to_hex());
                if let Some(name) = project_name {
                    meta.insert("project_name".into(), name);
                }
                if let Some(link) = project_link {
                    meta.insert("project_link".into(), link);
                }
            }
        }
        meta
    }

    pub fn from_metadata(meta: &HashMap<String, String>) -> Result<Self, ApiError> {
        let get_id = |key: &str| -> Result<ObjectId, ApiError> {
            let raw = meta
                .get(key)
                .ok_or_else(|| ApiError::BadRequest(format!("Missing metadata field: {key}")))?;
            ObjectId::parse_str(raw)
                .map_err(|_| ApiError::BadRequest(format!("Invalid metadata field: {key}")))
        };

        let kind = meta
            .get(KIND_KEY)
            .ok_or_else(|| ApiError::BadRequest("Missing metadata field: kind".into()))?;
        match kind.as_str() {
            "consultation" => Ok(CheckoutKind::Consultation {
                user_id: get_id("user")?,
                consultation_id: get_id("consultation")?,
            }),
            "in_person_course" => Ok(CheckoutKind::InPersonCourse {
                user_id: get_id("user")?,
                course_id: get_id("course")?,
                in_person_course_id: get_id("in_person_course")?,
            }),
            "recorded_course" => Ok(CheckoutKind::RecordedCourse {
                user_id: get_id("user")?,
                course_id: get_id("course")?,
                recorded_course_id: get_id("recorded_course")?,
            }),
            "event_registration" => Ok(CheckoutKind::EventRegistration {
                user_id: get_id("user")?,
                event_id: get_id("event")?,
                project_name: meta.get("project_name").cloned(),
                project_link: meta.get("project_link").cloned(),
            }),
            other => Err(ApiError::BadRequest(format!(
                "Unknown checkout kind: {other}"
            ))),
        }
    }
}

/// Deadline for a pending booking created alongside a session.
pub fn session_deadline() -> DateTime {
    DateTime::from_chrono(Utc::now() + Duration::seconds(CHECKOUT_TTL_SECS))
}

pub fn is_expired(expires_at: Option<DateTime>) -> bool {
    matches!(expires_at, Some(deadline) if deadline < DateTime::now())
}

/// What to do with a pending booking once its session has been re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOutcome {
    /// The session was paid; settle the booking.
    Settle,
    /// The deadline passed without payment; cancel the booking and free
    /// whatever it was holding.
    Abandon,
    /// Still inside the payment window; leave the booking pending.
    Wait,
}

/// A paid session settles no matter how late verification arrives; the
/// provider stops accepting payment at the session deadline, so a paid
/// result past `expires_at` means the charge landed in time.
pub fn resolve_pending(session_paid: bool, expires_at: Option<DateTime>) -> PendingOutcome {
    if session_paid {
        PendingOutcome::Settle
    } else if is_expired(expires_at) {
        PendingOutcome::Abandon
    } else {
        PendingOutcome::Wait
    }
}

/// Opens a hosted checkout session for `kind`, pricing in whole currency
/// units.
pub async fn start_session(
    state: &AppState,
    kind: CheckoutKind,
    product_name: String,
    product_description: Option<String>,
    price_units: i64,
    customer_email: Option<String>,
) -> ApiResult<CheckoutSession> {
    if price_units <= 0 {
        return Err(ApiError::BadRequest("Price must be positive".into()));
    }

    let request = CheckoutSessionRequest {
        product_name,
        product_description,
        amount_cents: price_units * 100,
        currency: "usd".into(),
        success_url: format!(
            "{}/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            state.config.client_url
        ),
        cancel_url: format!("{}/payment-cancelled", state.config.client_url),
        customer_email,
        metadata: kind.into_metadata(),
        expires_at: Some(Utc::now().timestamp() + CHECKOUT_TTL_SECS),
    };

    let session = state.payments.create_checkout_session(request).await?;
    info!(session = %session.id, "checkout session created");
    Ok(session)
}

/// Applies a completed checkout session: dispatches on the metadata kind and
/// settles the matching booking. Idempotent end to end; replays and repeated
/// verification calls find nothing pending and fall through.
pub async fn fulfill(state: &Arc<AppState>, session: &CheckoutSession) -> ApiResult<()> {
    if !session.is_paid() {
        return Ok(());
    }

    match CheckoutKind::from_metadata(&session.metadata)? {
        CheckoutKind::Consultation { .. } => {
            queries::confirm_consultation_payment(&state.db, &session.id).await?;
        }
        CheckoutKind::InPersonCourse { .. } => {
            queries::confirm_in_person_payment(&state.db, &session.id).await?;
        }
        CheckoutKind::RecordedCourse { .. } => {
            queries::confirm_recorded_payment(&state.db, &session.id).await?;
        }
        CheckoutKind::EventRegistration {
            user_id,
            event_id,
            project_name,
            project_link,
        } => {
            register_paid_attendee(state, user_id, event_id, project_name, project_link).await?;
        }
    }
    Ok(())
}

/// Inserts the paid event registration a completed session stands for.
/// Seat and duplicate checks ran before the session was created, but the
/// window between checkout and payment means they must run again here.
async fn register_paid_attendee(
    state: &Arc<AppState>,
    user_id: ObjectId,
    event_id: ObjectId,
    project_name: Option<String>,
    project_link: Option<String>,
) -> ApiResult<()> {
    if queries::user_registered_for_event(&state.db, user_id, event_id).await? {
        return Ok(());
    }

    let event = state
        .db
        .events()
        .find_one(bson::doc! { "_id": event_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;

    let taken = queries::event_registration_count(&state.db, event_id).await?;
    if taken as i64 >= event.seats {
        // Paid but no seat left; registration is refused and flagged for
        // manual follow-up.
        warn!(%event_id, %user_id, "paid registration for a full event");
        return Err(ApiError::Conflict("Event is fully booked".into()));
    }

    let now = DateTime::now();
    let registration = EventRegistration {
        id: ObjectId::new(),
        user: user_id,
        event: event_id,
        project_name,
        project_link,
        paid: true,
        created_at: now,
        updated_at: now,
    };
    match state.db.event_registrations().insert_one(&registration).await {
        Ok(_) => {
            info!(%event_id, %user_id, "event registration recorded");
            Ok(())
        }
        // The unique {user, event} index makes concurrent webhook replays a
        // no-op rather than a duplicate.
        Err(e) if is_duplicate_key(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        *error.kind,
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we))
            if we.code == 11000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_round_trip_all_kinds() {
        let kinds = vec![
            CheckoutKind::Consultation {
                user_id: ObjectId::new(),
                consultation_id: ObjectId::new(),
            },
            CheckoutKind::InPersonCourse {
                user_id: ObjectId::new(),
                course_id: ObjectId::new(),
                in_person_course_id: ObjectId::new(),
            },
            CheckoutKind::RecordedCourse {
                user_id: ObjectId::new(),
                course_id: ObjectId::new(),
                recorded_course_id: ObjectId::new(),
            },
            CheckoutKind::EventRegistration {
                user_id: ObjectId::new(),
                event_id: ObjectId::new(),
                project_name: Some("Murshid".into()),
                project_link: Some("https://example.com".into()),
            },
        ];
        for kind in kinds {
            let meta = kind.clone().into_metadata();
            assert_eq!(CheckoutKind::from_metadata(&meta).unwrap(), kind);
        }
    }

    #[test]
    fn metadata_rejects_unknown_kind() {
        let mut meta = HashMap::new();
        meta.insert("kind".to_string(), "gift_card".to_string());
        meta.insert("user".to_string(), ObjectId::new().to_hex());
        assert!(CheckoutKind::from_metadata(&meta).is_err());
    }

    #[test]
    fn metadata_rejects_missing_fields() {
        let mut meta = HashMap::new();
        meta.insert("kind".to_string(), "consultation".to_string());
        assert!(CheckoutKind::from_metadata(&meta).is_err());

        meta.insert("user".to_string(), "not-hex".to_string());
        meta.insert("consultation".to_string(), ObjectId::new().to_hex());
        assert!(CheckoutKind::from_metadata(&meta).is_err());
    }

    #[test]
    fn expiry_detection() {
        assert!(!is_expired(None));
        assert!(!is_expired(Some(session_deadline())));

        let past = DateTime::from_chrono(Utc::now() - Duration::minutes(1));
        assert!(is_expired(Some(past)));
    }

    #[test]
    fn unpaid_booking_past_deadline_is_abandoned() {
        let past = DateTime::from_chrono(Utc::now() - Duration::minutes(1));
        assert_eq!(resolve_pending(false, Some(past)), PendingOutcome::Abandon);
        // A late-but-paid session still settles.
        assert_eq!(resolve_pending(true, Some(past)), PendingOutcome::Settle);
    }

    #[test]
    fn unpaid_booking_inside_window_stays_pending() {
        assert_eq!(
            resolve_pending(false, Some(session_deadline())),
            PendingOutcome::Wait
        );
        assert_eq!(resolve_pending(false, None), PendingOutcome::Wait);
    }
}
