//! Infrastructure traits, used for DI on higher levels

use crate::infrastructure::entities;
use crate::infrastructure::entities::{Booking, BookingStatus};
use async_trait::async_trait;
use uuid::Uuid;

/// Decides whether a booking clashes with the other approved bookings of its
/// location. Called inside the write transaction.
pub type ConflictCheck<'a> = &'a (dyn Fn(&Booking, &[Booking]) -> bool + Send + Sync);

#[derive(Debug)]
pub enum BookingWrite {
    Written(Booking),
    Conflict,
}

#[derive(Debug, Default, Clone)]
pub struct BookingFilter {
    pub id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub user_email: Option<String>,
}

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn list_locations(&self) -> Result<Vec<entities::Location>, sqlx::Error>;

    async fn find_location(&self, location_id: Uuid)
    -> Result<Option<entities::Location>, sqlx::Error>;

    async fn create_location(
        &self,
        location: entities::Location,
    ) -> Result<entities::Location, sqlx::Error>;

    async fn update_location(
        &self,
        location: entities::Location,
    ) -> Result<Option<entities::Location>, sqlx::Error>;

    async fn delete_location(&self, location_id: Uuid) -> Result<bool, sqlx::Error>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, sqlx::Error>;

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, sqlx::Error>;

    /// Inserts `booking` unless `conflicts` rejects it. When `replaces` is
    /// set, that booking is deleted in the same transaction and is not part
    /// of the conflict check.
    async fn insert_booking(
        &self,
        booking: Booking,
        replaces: Option<Uuid>,
        conflicts: ConflictCheck<'_>,
    ) -> Result<BookingWrite, sqlx::Error>;

    /// Fails with `RowNotFound` if the booking does not exist.
    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        conflicts: ConflictCheck<'_>,
    ) -> Result<BookingWrite, sqlx::Error>;

    async fn delete_booking(&self, booking_id: Uuid) -> Result<bool, sqlx::Error>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> Result<Vec<entities::User>, sqlx::Error>;

    async fn list_users_by_role(
        &self,
        role: entities::Role,
    ) -> Result<Vec<entities::User>, sqlx::Error>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<entities::User>, sqlx::Error>;

    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<entities::User>, sqlx::Error>;

    async fn create_user(&self, user: entities::User) -> Result<entities::User, sqlx::Error>;

    async fn update_user(
        &self,
        user: entities::User,
    ) -> Result<Option<entities::User>, sqlx::Error>;

    async fn delete_user(&self, user_id: Uuid) -> Result<bool, sqlx::Error>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// All conversations when `user_email` is `None`.
    async fn list_conversations(
        &self,
        user_email: Option<&str>,
    ) -> Result<Vec<entities::Conversation>, sqlx::Error>;

    async fn find_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<entities::Conversation>, sqlx::Error>;

    async fn create_conversation(
        &self,
        conversation: entities::Conversation,
    ) -> Result<entities::Conversation, sqlx::Error>;

    async fn delete_conversation(&self, conversation_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn list_conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<entities::Message>, sqlx::Error>;

    async fn create_message_in_conversation(
        &self,
        message: entities::Message,
    ) -> Result<entities::Message, sqlx::Error>;
}

#[async_trait]
pub trait EmailTemplateRepository: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<entities::EmailTemplate>, sqlx::Error>;

    async fn find_template(
        &self,
        name: &str,
    ) -> Result<Option<entities::EmailTemplate>, sqlx::Error>;

    async fn upsert_template(
        &self,
        template: entities::EmailTemplate,
    ) -> Result<entities::EmailTemplate, sqlx::Error>;

    async fn enqueue_email(
        &self,
        email: entities::OutboxEmail,
    ) -> Result<entities::OutboxEmail, sqlx::Error>;

    async fn list_outbox(&self) -> Result<Vec<entities::OutboxEmail>, sqlx::Error>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn list_notifications(
        &self,
        user_email: &str,
    ) -> Result<Vec<entities::Notification>, sqlx::Error>;

    async fn create_notification(
        &self,
        notification: entities::Notification,
    ) -> Result<entities::Notification, sqlx::Error>;

    /// `None` if the notification does not exist or belongs to someone else.
    async fn mark_read(
        &self,
        notification_id: Uuid,
        user_email: &str,
    ) -> Result<Option<entities::Notification>, sqlx::Error>;
}
