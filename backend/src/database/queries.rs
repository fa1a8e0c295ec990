//! Shared query helpers used across handlers and the checkout service.
//!
//! Resource handlers talk to their own collections through the fluent
//! builders directly; the functions here are the ones several call sites
//! share, mostly around payment confirmation.

use bson::{doc, oid::ObjectId, DateTime};
use futures::TryStreamExt;
use mongodb::options::ReturnDocument;

use crate::database::models::*;
use crate::database::Db;
use crate::errors::ApiResult;

pub async fn find_user_by_email(db: &Db, email: &str) -> ApiResult<Option<User>> {
    Ok(db.users().find_one(doc! { "email": email }).await?)
}

pub async fn find_user_by_id(db: &Db, id: ObjectId) -> ApiResult<Option<User>> {
    Ok(db.users().find_one(doc! { "_id": id }).await?)
}

/// Marks a consultation slot as booked by a user, but only if it is still
/// available. Returns the updated slot, or `None` when someone else got
/// there first.
pub async fn claim_consultation_slot(
    db: &Db,
    slot_id: ObjectId,
    user_id: ObjectId,
    method: PaymentMethod,
) -> ApiResult<Option<Consultation>> {
    let updated = db
        .consultations()
        .find_one_and_update(
            doc! { "_id": slot_id, "status": "available" },
            doc! { "$set": {
                "status": "booked",
                "user_id": user_id,
                "payment_method": method.as_str(),
                "payment_status": "pending",
                "booked_at": DateTime::now(),
                "updated_at": DateTime::now(),
            }},
        )
        .return_document(ReturnDocument::After)
        .await?;
    Ok(updated)
}

/// Releases a slot whose checkout never completed.
pub async fn release_consultation_slot(db: &Db, slot_id: ObjectId) -> ApiResult<()> {
    db.consultations()
        .update_one(
            doc! { "_id": slot_id, "status": "booked" },
            doc! {
                "$set": { "status": "available", "updated_at": DateTime::now() },
                "$unset": {
                    "user_id": "",
                    "payment_method": "",
                    "payment_status": "",
                    "booked_at": "",
                },
            },
        )
        .await?;
    Ok(())
}

/// Cancels a pending consultation booking whose checkout session lapsed
/// unpaid and puts its slot back on the market. Idempotent: a booking that
/// was already settled or cancelled matches nothing.
pub async fn abandon_consultation_checkout(db: &Db, session_id: &str) -> ApiResult<bool> {
    let booking = db
        .consultation_bookings()
        .find_one_and_update(
            doc! {
                "session_id": session_id,
                "payment_status": "pending",
                "status": "pending",
            },
            doc! { "$set": {
                "status": "cancelled",
                "updated_at": DateTime::now(),
            }},
        )
        .return_document(ReturnDocument::After)
        .await?;

    let Some(booking) = booking else {
        return Ok(false);
    };

    release_consultation_slot(db, booking.consultation_id).await?;
    Ok(true)
}

/// Sweeps every pending stripe consultation booking whose checkout deadline
/// has passed, cancelling the booking and reopening its slot.
pub async fn sweep_expired_consultation_checkouts(db: &Db) -> ApiResult<u64> {
    let mut cursor = db
        .consultation_bookings()
        .find(doc! {
            "payment_method": "stripe",
            "payment_status": "pending",
            "status": "pending",
            "expires_at": { "$lt": DateTime::now() },
        })
        .await?;

    let mut cancelled = 0u64;
    while let Some(booking) = cursor.try_next().await? {
        let updated = db
            .consultation_bookings()
            .update_one(
                doc! { "_id": booking.id, "status": "pending" },
                doc! { "$set": { "status": "cancelled", "updated_at": DateTime::now() } },
            )
            .await?;
        if updated.modified_count > 0 {
            release_consultation_slot(db, booking.consultation_id).await?;
            cancelled += 1;
        }
    }
    Ok(cancelled)
}

/// Flips a pending consultation booking to paid/confirmed and updates the
/// slot itself. Idempotent: a booking that is already confirmed matches
/// nothing and the call is a no-op.
pub async fn confirm_consultation_payment(db: &Db, session_id: &str) -> ApiResult<bool> {
    let booking = db
        .consultation_bookings()
        .find_one_and_update(
            doc! { "session_id": session_id, "payment_status": "pending" },
            doc! { "$set": {
                "payment_status": "paid",
                "status": "confirmed",
                "paid_at": DateTime::now(),
                "updated_at": DateTime::now(),
            }},
        )
        .return_document(ReturnDocument::After)
        .await?;

    let Some(booking) = booking else {
        return Ok(false);
    };

    db.consultations()
        .update_one(
            doc! { "_id": booking.consultation_id },
            doc! { "$set": {
                "status": "confirmed",
                "payment_status": "paid",
                "updated_at": DateTime::now(),
            }},
        )
        .await?;
    Ok(true)
}

pub async fn confirm_in_person_payment(db: &Db, session_id: &str) -> ApiResult<bool> {
    let updated = db
        .in_person_course_bookings()
        .update_one(
            doc! { "session_id": session_id, "payment_status": "pending" },
            doc! { "$set": {
                "payment_status": "paid",
                "status": "confirmed",
                "paid_at": DateTime::now(),
                "updated_at": DateTime::now(),
            }},
        )
        .await?;
    Ok(updated.modified_count > 0)
}

pub async fn confirm_recorded_payment(db: &Db, session_id: &str) -> ApiResult<bool> {
    let updated = db
        .recorded_course_bookings()
        .update_one(
            doc! { "session_id": session_id, "payment_status": "pending" },
            doc! { "$set": {
                "payment_status": "paid",
                "paid_at": DateTime::now(),
                "updated_at": DateTime::now(),
            }},
        )
        .await?;
    Ok(updated.modified_count > 0)
}

pub async fn user_owns_recorded_course(
    db: &Db,
    user_id: ObjectId,
    course_id: ObjectId,
) -> ApiResult<bool> {
    let existing = db
        .recorded_course_bookings()
        .find_one(doc! {
            "user_id": user_id,
            "course_id": course_id,
            "payment_status": "paid",
        })
        .await?;
    Ok(existing.is_some())
}

pub async fn event_registration_count(db: &Db, event_id: ObjectId) -> ApiResult<u64> {
    Ok(db
        .event_registrations()
        .count_documents(doc! { "event": event_id })
        .await?)
}

pub async fn user_registered_for_event(
    db: &Db,
    user_id: ObjectId,
    event_id: ObjectId,
) -> ApiResult<bool> {
    let existing = db
        .event_registrations()
        .find_one(doc! { "user": user_id, "event": event_id })
        .await?;
    Ok(existing.is_some())
}
