//! MongoDB connection handling and typed collection access.

pub mod models;
pub mod queries;

use bson::doc;
use mongodb::{
    options::{ClientOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use tracing::info;

use crate::config::Config;
use models::*;

/// Shared handle to the application database.
#[derive(Clone)]
pub struct Db {
    database: Database,
}

impl Db {
    pub async fn connect(config: &Config) -> mongodb::error::Result<Self> {
        let options = ClientOptions::parse(&config.mongo_uri).await?;
        let client = Client::with_options(options)?;
        let database = client.database(&config.mongo_db);

        // Fail fast on bad credentials / unreachable host.
        database.run_command(doc! { "ping": 1 }).await?;
        info!(db = %config.mongo_db, "connected to MongoDB");

        Ok(Self { database })
    }

    pub fn users(&self) -> Collection<User> {
        self.database.collection("users")
    }

    pub fn courses(&self) -> Collection<Course> {
        self.database.collection("courses")
    }

    pub fn recorded_courses(&self) -> Collection<RecordedCourse> {
        self.database.collection("recorded_courses")
    }

    pub fn in_person_courses(&self) -> Collection<InPersonCourse> {
        self.database.collection("in_person_courses")
    }

    pub fn consultations(&self) -> Collection<Consultation> {
        self.database.collection("consultations")
    }

    pub fn consultation_bookings(&self) -> Collection<ConsultationBooking> {
        self.database.collection("consultation_bookings")
    }

    pub fn in_person_course_bookings(&self) -> Collection<InPersonCourseBooking> {
        self.database.collection("in_person_course_bookings")
    }

    pub fn recorded_course_bookings(&self) -> Collection<RecordedCourseBooking> {
        self.database.collection("recorded_course_bookings")
    }

    pub fn events(&self) -> Collection<Event> {
        self.database.collection("events")
    }

    pub fn event_registrations(&self) -> Collection<EventRegistration> {
        self.database.collection("event_registrations")
    }

    pub fn faqs(&self) -> Collection<Faq> {
        self.database.collection("faqs")
    }

    pub fn podcasts(&self) -> Collection<Podcast> {
        self.database.collection("podcasts")
    }

    /// Creates the indexes the query layer relies on. Safe to run on every
    /// startup; MongoDB treats an existing identical index as a no-op.
    pub async fn ensure_indexes(&self) -> mongodb::error::Result<()> {
        let unique = IndexOptions::builder().unique(true).build();

        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await?;

        self.consultations()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "scheduled_at": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await?;

        self.event_registrations()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user": 1, "event": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;

        self.faqs()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "question": "text", "answer": "text" })
                    .build(),
            )
            .await?;
        self.faqs()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "is_active": 1, "display_order": 1 })
                    .build(),
            )
            .await?;

        self.podcasts()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "title": "text", "description": "text" })
                    .build(),
            )
            .await?;
        self.podcasts()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "is_active": 1, "display_order": 1 })
                    .build(),
            )
            .await?;

        self.consultation_bookings()
            .create_index(IndexModel::builder().keys(doc! { "session_id": 1 }).build())
            .await?;
        self.in_person_course_bookings()
            .create_index(IndexModel::builder().keys(doc! { "session_id": 1 }).build())
            .await?;
        self.recorded_course_bookings()
            .create_index(IndexModel::builder().keys(doc! { "session_id": 1 }).build())
            .await?;

        info!("database indexes ensured");
        Ok(())
    }
}
