//! Rust structs that represent document mappings.
//!
//! These models define the shape of data as stored in MongoDB. API-facing
//! representations (sanitized users, formatted dates) live next to their
//! handlers; everything here serializes straight to BSON.

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub full_name: String,
    pub email: String,
    /// Argon2 hash, never exposed through the API.
    pub password: String,
    pub phone_number: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_code_expires: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    pub fn new(
        full_name: String,
        email: String,
        password_hash: String,
        phone_number: String,
        role: Role,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            full_name,
            email,
            password: password_hash,
            phone_number,
            role,
            reset_code: None,
            reset_code_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseKind {
    Recorded,
    InPerson,
}

/// Catalog entry shared by recorded and in-person offerings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub image: String,
    /// Duration in hours.
    pub duration: i64,
    /// Price in whole currency units; converted to cents at checkout.
    pub price: i64,
    pub kind: CourseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_course: Option<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseFile {
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedCourse {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub files: Vec<CourseFile>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// A scheduled run of an in-person course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InPersonCourse {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub course_id: ObjectId,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub location: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    Available,
    Booked,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub consultation_type: String,
    /// Unique: one slot per point in time.
    pub scheduled_at: DateTime,
    pub price: i64,
    pub status: ConsultationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Stripe,
    Cash,
    External,
}

impl PaymentMethod {
    /// Stored wire name, identical to the serde rename.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Cash => "cash",
            PaymentMethod::External => "external",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationBooking {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub consultation_id: ObjectId,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InPersonCourseBooking {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub course_id: ObjectId,
    pub in_person_course_id: ObjectId,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedCourseBooking {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub course_id: ObjectId,
    pub recorded_course_id: ObjectId,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Regular,
    CoffeeMeet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    pub date: DateTime,
    pub location: String,
    pub price: i64,
    pub kind: EventKind,
    pub seats: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRegistration {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub event: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_link: Option<String>,
    pub paid: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faq {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub question: String,
    pub answer: String,
    pub is_active: bool,
    pub display_order: i64,
    pub created_by: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Podcast {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub youtube_url: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub is_active: bool,
    pub display_order: i64,
    pub created_by: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Wire names are load-bearing: they are both the stored values and the
    // strings the frontend matches on.
    #[test]
    fn enum_wire_names() {
        assert_eq!(serde_json::to_value(CourseKind::InPerson).unwrap(), "in_person");
        assert_eq!(serde_json::to_value(CourseKind::Recorded).unwrap(), "recorded");
        assert_eq!(serde_json::to_value(EventKind::CoffeeMeet).unwrap(), "coffee_meet");
        assert_eq!(serde_json::to_value(PaymentMethod::Stripe).unwrap(), "stripe");
        assert_eq!(serde_json::to_value(PaymentStatus::Pending).unwrap(), "pending");
        assert_eq!(serde_json::to_value(BookingStatus::Confirmed).unwrap(), "confirmed");
        assert_eq!(
            serde_json::to_value(ConsultationStatus::Available).unwrap(),
            "available"
        );
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
    }

    #[test]
    fn user_hides_absent_reset_fields() {
        let user = User::new(
            "Test User".into(),
            "user@example.com".into(),
            "hash".into(),
            "0500000000".into(),
            Role::User,
        );
        let doc = bson::to_document(&user).unwrap();

        assert!(doc.get("reset_code").is_none());
        assert!(doc.get("reset_code_expires").is_none());
        assert_eq!(doc.get_str("email").unwrap(), "user@example.com");
    }

    #[test]
    fn documents_round_trip_through_bson() {
        let user = User::new(
            "Round Trip".into(),
            "rt@example.com".into(),
            "hash".into(),
            "0500000000".into(),
            Role::Admin,
        );
        let doc = bson::to_document(&user).unwrap();
        let back: User = bson::from_document(doc).unwrap();

        assert_eq!(back.id, user.id);
        assert_eq!(back.role, Role::Admin);
    }
}
