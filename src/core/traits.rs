//! DI "Interfaces"

use crate::core::availability::{DateRange, DaySlots};
use crate::core::templates::RenderedEmail;
use crate::error::AppResult;
use crate::infrastructure::entities;
use crate::infrastructure::entities::{BookableItem, BookingStatus, MessageKind, Role};
use crate::infrastructure::traits::BookingFilter;
use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LocationDraft {
    pub name: String,
    pub address: String,
    pub image_url: String,
    pub items: Vec<BookableItem>,
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub location_id: Uuid,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub department: String,
    pub occasion: String,
}

#[derive(Debug, Clone)]
pub struct Availability {
    pub days: Vec<DaySlots>,
    pub start_options: Vec<NaiveTime>,
    /// Only computed when a start time was chosen.
    pub end_options: Option<Vec<NaiveTime>>,
}

#[derive(Debug, Clone)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

#[async_trait]
pub trait LocationService: Send + Sync {
    async fn list_locations(&self) -> AppResult<Vec<entities::Location>>;

    async fn get_location(&self, location_id: Uuid) -> AppResult<entities::Location>;

    /// Admin only.
    async fn create_location(
        &self,
        caller: &entities::User,
        draft: LocationDraft,
    ) -> AppResult<entities::Location>;

    /// Admin only.
    async fn update_location(
        &self,
        caller: &entities::User,
        location_id: Uuid,
        draft: LocationDraft,
    ) -> AppResult<entities::Location>;

    /// Admin only. Bookings of the location are deleted with it.
    async fn delete_location(&self, caller: &entities::User, location_id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait BookingService: Send + Sync {
    /// Lists bookings matching `filter`. Non-admin callers only see their own
    /// bookings whatever the filter says.
    async fn list_bookings(
        &self,
        caller: &entities::User,
        filter: BookingFilter,
    ) -> AppResult<Vec<entities::Booking>>;

    /// Creates a pending booking for the caller.
    ///
    /// Returns `Conflict` if the range overlaps an approved booking of the
    /// location or a blackout window.
    async fn create_booking(
        &self,
        caller: &entities::User,
        draft: BookingDraft,
    ) -> AppResult<entities::Booking>;

    /// Approves or rejects a booking. Admin only.
    ///
    /// Approving fails with `Conflict` when another approved booking of the
    /// same location overlaps.
    async fn update_status(
        &self,
        caller: &entities::User,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> AppResult<entities::Booking>;

    /// Replaces the booking by a new pending one with the given range.
    async fn reschedule(
        &self,
        caller: &entities::User,
        booking_id: Uuid,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> AppResult<entities::Booking>;

    /// Deletes a booking. Owner or admin.
    async fn cancel(&self, caller: &entities::User, booking_id: Uuid) -> AppResult<()>;

    /// Slot grid of a location over `range`.
    async fn availability(
        &self,
        location_id: Uuid,
        range: DateRange,
        start: Option<NaiveTime>,
    ) -> AppResult<Availability>;
}

#[async_trait]
pub trait UserService: Send + Sync {
    /// Resolves the user behind the identity header.
    ///
    /// Returns `UnknownCaller` if no profile exists for the email.
    async fn resolve_caller(&self, email: &str) -> AppResult<entities::User>;

    /// Admin only.
    async fn list_users(&self, caller: &entities::User) -> AppResult<Vec<entities::User>>;

    /// Admin, or the user themselves.
    async fn get_user(&self, caller: &entities::User, user_id: Uuid)
    -> AppResult<entities::User>;

    /// Admin, or the user themselves. Only admins may change a role.
    async fn update_user(
        &self,
        caller: &entities::User,
        user_id: Uuid,
        patch: UserPatch,
    ) -> AppResult<entities::User>;

    /// Admin only.
    async fn delete_user(&self, caller: &entities::User, user_id: Uuid) -> AppResult<()>;

    /// Creates the profile of a newly signed-up user.
    async fn sign_up(&self, sign_up: SignUp) -> AppResult<entities::User>;

    async fn log_in(&self, email: &str) -> AppResult<entities::User>;

    /// Enqueues the reset email if the user exists; silent otherwise.
    async fn request_password_reset(&self, email: &str) -> AppResult<()>;
}

#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Lists the conversations of the caller, or every conversation for admins.
    async fn list_conversations(
        &self,
        caller: &entities::User,
    ) -> AppResult<Vec<entities::Conversation>>;

    /// Creates a new conversation owned by the caller.
    async fn create_conversation(
        &self,
        caller: &entities::User,
    ) -> AppResult<entities::Conversation>;

    /// Deletes a conversation and its messages.
    ///
    /// Returns `Forbidden` if the caller is neither the owner nor an admin.
    async fn delete_conversation(
        &self,
        caller: &entities::User,
        conversation_id: Uuid,
    ) -> AppResult<()>;

    /// List all messages in a conversation, oldest first.
    ///
    /// Returns `Forbidden` if the caller doesn't have permissions to view this conversation.
    async fn list_messages(
        &self,
        caller: &entities::User,
        conversation_id: Uuid,
    ) -> AppResult<Vec<entities::Message>>;

    /// Creates a new message in a conversation and publishes it to live
    /// subscribers.
    ///
    /// `post_message` should be used instead, it picks the kind from the caller.
    async fn create_raw_message(
        &self,
        caller: &entities::User,
        conversation_id: Uuid,
        kind: MessageKind,
        content: String,
    ) -> AppResult<entities::Message>;

    /// Subscribes to new messages of a conversation.
    async fn subscribe(
        &self,
        caller: &entities::User,
        conversation_id: Uuid,
    ) -> AppResult<broadcast::Receiver<entities::Message>>;

    /// Posts a message as the caller: a user message for the owner, an admin
    /// message for admins.
    async fn post_message(
        &self,
        caller: &entities::User,
        conversation_id: Uuid,
        content: String,
    ) -> AppResult<entities::Message> {
        let kind = if caller.is_admin() {
            MessageKind::Admin
        } else {
            MessageKind::User
        };

        self.create_raw_message(caller, conversation_id, kind, content)
            .await
    }
}

#[async_trait]
pub trait EmailService: Send + Sync {
    /// Admin only.
    async fn list_templates(
        &self,
        caller: &entities::User,
    ) -> AppResult<Vec<entities::EmailTemplate>>;

    /// Admin only.
    async fn get_template(
        &self,
        caller: &entities::User,
        name: &str,
    ) -> AppResult<entities::EmailTemplate>;

    /// Creates or replaces a template. Admin only.
    ///
    /// Returns `Template` if subject or body do not parse.
    async fn save_template(
        &self,
        caller: &entities::User,
        name: String,
        subject: String,
        body: String,
    ) -> AppResult<entities::EmailTemplate>;

    /// Renders a stored template against `context`. Admin only.
    async fn preview(
        &self,
        caller: &entities::User,
        name: &str,
        context: serde_json::Value,
    ) -> AppResult<RenderedEmail>;

    /// Admin only.
    async fn list_outbox(&self, caller: &entities::User)
    -> AppResult<Vec<entities::OutboxEmail>>;

    /// Renders the template and hands the email to the outbox.
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        context: minijinja::Value,
    ) -> AppResult<entities::OutboxEmail>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn list_notifications(
        &self,
        caller: &entities::User,
    ) -> AppResult<Vec<entities::Notification>>;

    /// Returns `NotFound` for notifications of other users.
    async fn mark_read(
        &self,
        caller: &entities::User,
        notification_id: Uuid,
    ) -> AppResult<entities::Notification>;

    async fn notify(&self, user_email: &str, message: String)
    -> AppResult<entities::Notification>;
}
