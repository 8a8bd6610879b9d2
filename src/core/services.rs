//! Implementations for the service the app needs.
//!

use crate::config::Settings;
use crate::core::availability::{DateRange, SlotFilter, is_slot_label};
use crate::core::chat::ChatHub;
use crate::core::templates::{self, RenderedEmail};
use crate::core::traits::{
    Availability, BookingDraft, BookingService, ConversationService, EmailService,
    LocationDraft, LocationService, NotificationService, SignUp, UserPatch, UserService,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::entities::{
    Booking, BookingStatus, Conversation, EmailTemplate, Location, Message, MessageKind,
    Notification, OutboxEmail, Role, User,
};
use crate::infrastructure::traits::{
    BookingFilter, BookingRepository, BookingWrite, ConversationRepository,
    EmailTemplateRepository, LocationRepository, NotificationRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime, Utc};
use di::{Ref, injectable};
use log::{info, warn};
use minijinja::context;
use sqlx::types::Json;
use tokio::sync::broadcast;
use uuid::Uuid;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

fn require_admin(caller: &User) -> AppResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}

fn is_owner_or_admin(caller: &User, owner_email: &str) -> bool {
    caller.is_admin() || caller.email == owner_email
}

/// Bookings cover whole slots within a single day.
fn validate_range(start: NaiveDateTime, end: NaiveDateTime) -> AppResult<()> {
    if start >= end {
        return Err(AppError::BadRequest(
            "startTime must be before endTime".to_owned(),
        ));
    }
    if start.date() != end.date() {
        return Err(AppError::BadRequest(
            "a booking must start and end on the same day".to_owned(),
        ));
    }
    if !is_slot_label(start.time()) || !is_slot_label(end.time()) {
        return Err(AppError::BadRequest(
            "startTime and endTime must be half-hour slots between 07:00 and 21:30".to_owned(),
        ));
    }

    Ok(())
}

#[injectable(LocationService)]
pub struct DbLocationService {
    repo: Ref<dyn LocationRepository>,
}

#[async_trait]
impl LocationService for DbLocationService {
    async fn list_locations(&self) -> AppResult<Vec<Location>> {
        Ok(self.repo.list_locations().await?)
    }

    async fn get_location(&self, location_id: Uuid) -> AppResult<Location> {
        self.repo
            .find_location(location_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("location {location_id}")))
    }

    async fn create_location(&self, caller: &User, draft: LocationDraft) -> AppResult<Location> {
        require_admin(caller)?;

        let location = self
            .repo
            .create_location(Location {
                id: Uuid::new_v4(),
                name: draft.name,
                address: draft.address,
                image_url: draft.image_url,
                items: Json(draft.items),
                amenities: Json(draft.amenities),
                created_at: Utc::now(),
            })
            .await?;

        info!("location {} created by {}", location.id, caller.email);
        Ok(location)
    }

    async fn update_location(
        &self,
        caller: &User,
        location_id: Uuid,
        draft: LocationDraft,
    ) -> AppResult<Location> {
        require_admin(caller)?;

        self.repo
            .update_location(Location {
                id: location_id,
                name: draft.name,
                address: draft.address,
                image_url: draft.image_url,
                items: Json(draft.items),
                amenities: Json(draft.amenities),
                created_at: Utc::now(),
            })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("location {location_id}")))
    }

    async fn delete_location(&self, caller: &User, location_id: Uuid) -> AppResult<()> {
        require_admin(caller)?;

        if !self.repo.delete_location(location_id).await? {
            return Err(AppError::NotFound(format!("location {location_id}")));
        }

        info!("location {location_id} deleted by {}", caller.email);
        Ok(())
    }
}

#[injectable(BookingService)]
pub struct DbBookingService {
    bookings: Ref<dyn BookingRepository>,
    locations: Ref<dyn LocationRepository>,
    users: Ref<dyn UserRepository>,
    notifications: Ref<dyn NotificationService>,
    email: Ref<dyn EmailService>,
    settings: Ref<Settings>,
}

impl DbBookingService {
    async fn location_name(&self, location_id: Uuid) -> String {
        match self.locations.find_location(location_id).await {
            Ok(Some(location)) => location.name,
            _ => location_id.to_string(),
        }
    }

    /// Email failures never fail the request.
    async fn email_quietly(&self, template: &str, booking: &Booking) {
        let location_name = self.location_name(booking.location_id).await;
        let context = context! {
            userEmail => &booking.user_email,
            locationName => location_name,
            startTime => booking.start_time.format(DATE_TIME_FORMAT).to_string(),
            endTime => booking.end_time.format(DATE_TIME_FORMAT).to_string(),
            status => booking.status,
            department => &booking.department,
            occasion => &booking.occasion,
        };

        if let Err(e) = self
            .email
            .send(template, &booking.user_email, context)
            .await
        {
            warn!(
                "failed to send `{template}` email for booking {}: {e}",
                booking.id
            );
        }
    }

    async fn notify_quietly(&self, user_email: &str, message: String) {
        if let Err(e) = self.notifications.notify(user_email, message).await {
            warn!("failed to notify {user_email}: {e}");
        }
    }

    async fn notify_admins_quietly(&self, message: String) {
        match self.users.list_users_by_role(Role::Admin).await {
            Ok(admins) => {
                for admin in admins {
                    self.notify_quietly(&admin.email, message.clone()).await;
                }
            }
            Err(e) => warn!("failed to list admins: {e}"),
        }
    }

    fn conflict() -> AppError {
        AppError::Conflict(
            "the selected time overlaps an approved booking or a blackout window".to_owned(),
        )
    }
}

#[async_trait]
impl BookingService for DbBookingService {
    async fn list_bookings(&self, caller: &User, mut filter: BookingFilter) -> AppResult<Vec<Booking>> {
        if !caller.is_admin() {
            filter.user_email = Some(caller.email.clone());
        }

        Ok(self.bookings.list_bookings(&filter).await?)
    }

    async fn create_booking(&self, caller: &User, draft: BookingDraft) -> AppResult<Booking> {
        validate_range(draft.start_time, draft.end_time)?;

        let location = self
            .locations
            .find_location(draft.location_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("location {}", draft.location_id)))?;

        let booking = Booking {
            id: Uuid::new_v4(),
            location_id: location.id,
            user_email: caller.email.clone(),
            start_time: draft.start_time,
            end_time: draft.end_time,
            status: BookingStatus::Pending,
            department: draft.department,
            occasion: draft.occasion,
            created_at: Utc::now(),
        };

        let blackouts = &self.settings.blackout_windows;
        let conflicts = |candidate: &Booking, approved: &[Booking]| {
            SlotFilter::new(approved, blackouts).conflicts(candidate.start_time, candidate.end_time)
        };

        match self.bookings.insert_booking(booking, None, &conflicts).await? {
            BookingWrite::Written(booking) => {
                info!(
                    "booking {} requested by {} at {}",
                    booking.id, booking.user_email, location.name
                );
                self.email_quietly("booking-received", &booking).await;
                self.notify_admins_quietly(format!(
                    "New booking request from {} for {} on {}",
                    booking.user_email,
                    location.name,
                    booking.start_time.format(DATE_TIME_FORMAT)
                ))
                .await;
                Ok(booking)
            }
            BookingWrite::Conflict => Err(Self::conflict()),
        }
    }

    async fn update_status(
        &self,
        caller: &User,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> AppResult<Booking> {
        require_admin(caller)?;

        if status == BookingStatus::Pending {
            return Err(AppError::BadRequest(
                "status must be `approved` or `rejected`".to_owned(),
            ));
        }

        let conflicts = |candidate: &Booking, approved: &[Booking]| {
            candidate.status == BookingStatus::Approved
                && SlotFilter::new(approved, &[])
                    .conflicts(candidate.start_time, candidate.end_time)
        };

        let booking = match self
            .bookings
            .update_booking_status(booking_id, status, &conflicts)
            .await?
        {
            BookingWrite::Written(booking) => booking,
            BookingWrite::Conflict => return Err(Self::conflict()),
        };

        info!("booking {} {:?} by {}", booking.id, booking.status, caller.email);

        let (template, verb) = match booking.status {
            BookingStatus::Approved => ("booking-approved", "approved"),
            _ => ("booking-rejected", "rejected"),
        };
        self.notify_quietly(
            &booking.user_email,
            format!(
                "Your booking at {} on {} was {verb}",
                self.location_name(booking.location_id).await,
                booking.start_time.format(DATE_TIME_FORMAT)
            ),
        )
        .await;
        self.email_quietly(template, &booking).await;

        Ok(booking)
    }

    async fn reschedule(
        &self,
        caller: &User,
        booking_id: Uuid,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> AppResult<Booking> {
        validate_range(start_time, end_time)?;

        let current = self
            .bookings
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

        if !is_owner_or_admin(caller, &current.user_email) {
            return Err(AppError::Forbidden(
                "only the owner can reschedule a booking".to_owned(),
            ));
        }

        let replacement = Booking {
            id: Uuid::new_v4(),
            start_time,
            end_time,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
            ..current
        };

        let blackouts = &self.settings.blackout_windows;
        let conflicts = |candidate: &Booking, approved: &[Booking]| {
            SlotFilter::new(approved, blackouts).conflicts(candidate.start_time, candidate.end_time)
        };

        match self
            .bookings
            .insert_booking(replacement, Some(booking_id), &conflicts)
            .await?
        {
            BookingWrite::Written(booking) => {
                info!("booking {booking_id} rescheduled as {}", booking.id);
                self.email_quietly("booking-received", &booking).await;
                self.notify_admins_quietly(format!(
                    "Booking request from {} was rescheduled to {} - {}",
                    booking.user_email,
                    booking.start_time.format(DATE_TIME_FORMAT),
                    booking.end_time.format("%H:%M")
                ))
                .await;
                Ok(booking)
            }
            BookingWrite::Conflict => Err(Self::conflict()),
        }
    }

    async fn cancel(&self, caller: &User, booking_id: Uuid) -> AppResult<()> {
        let booking = self
            .bookings
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

        if !is_owner_or_admin(caller, &booking.user_email) {
            return Err(AppError::Forbidden(
                "only the owner can cancel a booking".to_owned(),
            ));
        }

        if !self.bookings.delete_booking(booking_id).await? {
            return Err(AppError::NotFound(format!("booking {booking_id}")));
        }

        info!("booking {booking_id} cancelled by {}", caller.email);
        self.email_quietly("booking-cancelled", &booking).await;

        Ok(())
    }

    async fn availability(
        &self,
        location_id: Uuid,
        range: DateRange,
        start: Option<NaiveTime>,
    ) -> AppResult<Availability> {
        if let Some(start) = start {
            if !is_slot_label(start) {
                return Err(AppError::BadRequest(format!(
                    "{} is not a slot start",
                    start.format("%H:%M")
                )));
            }
        }

        if self.locations.find_location(location_id).await?.is_none() {
            return Err(AppError::NotFound(format!("location {location_id}")));
        }

        let bookings = self
            .bookings
            .list_bookings(&BookingFilter {
                location_id: Some(location_id),
                ..BookingFilter::default()
            })
            .await?;
        let filter = SlotFilter::new(&bookings, &self.settings.blackout_windows);

        Ok(Availability {
            days: filter.disabled_slots(&range),
            start_options: filter.start_options(&range),
            end_options: start.map(|start| filter.end_options(&range, start)),
        })
    }
}

#[injectable(UserService)]
pub struct DbUserService {
    repo: Ref<dyn UserRepository>,
    email: Ref<dyn EmailService>,
    settings: Ref<Settings>,
}

impl DbUserService {
    async fn email_quietly(&self, template: &str, user: &User) {
        let context = context! {
            userName => &user.name,
            userEmail => &user.email,
        };

        if let Err(e) = self.email.send(template, &user.email, context).await {
            warn!("failed to send `{template}` email to {}: {e}", user.email);
        }
    }

    async fn find(&self, user_id: Uuid) -> AppResult<User> {
        self.repo
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
    }
}

#[async_trait]
impl UserService for DbUserService {
    async fn resolve_caller(&self, email: &str) -> AppResult<User> {
        self.repo
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::UnknownCaller(email.to_owned()))
    }

    async fn list_users(&self, caller: &User) -> AppResult<Vec<User>> {
        require_admin(caller)?;
        Ok(self.repo.list_users().await?)
    }

    async fn get_user(&self, caller: &User, user_id: Uuid) -> AppResult<User> {
        if !caller.is_admin() && caller.id != user_id {
            return Err(AppError::forbidden());
        }

        self.find(user_id).await
    }

    async fn update_user(&self, caller: &User, user_id: Uuid, patch: UserPatch) -> AppResult<User> {
        if !caller.is_admin() && caller.id != user_id {
            return Err(AppError::forbidden());
        }
        if patch.role.is_some() && !caller.is_admin() {
            return Err(AppError::Forbidden(
                "only admins can change a role".to_owned(),
            ));
        }

        let current = self.find(user_id).await?;
        let updated = User {
            name: patch.name.unwrap_or(current.name),
            phone: patch.phone.or(current.phone),
            role: patch.role.unwrap_or(current.role),
            ..current
        };

        self.repo
            .update_user(updated)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
    }

    async fn delete_user(&self, caller: &User, user_id: Uuid) -> AppResult<()> {
        require_admin(caller)?;

        if !self.repo.delete_user(user_id).await? {
            return Err(AppError::NotFound(format!("user {user_id}")));
        }

        info!("user {user_id} deleted by {}", caller.email);
        Ok(())
    }

    async fn sign_up(&self, sign_up: SignUp) -> AppResult<User> {
        if self.repo.find_user_by_email(&sign_up.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "User with email {} already exists!",
                sign_up.email
            )));
        }

        let role = if self.settings.admin_emails.contains(&sign_up.email) {
            Role::Admin
        } else {
            Role::User
        };

        let user = self
            .repo
            .create_user(User {
                id: Uuid::new_v4(),
                name: sign_up.name,
                email: sign_up.email,
                role,
                joined_at: Utc::now(),
                phone: sign_up.phone,
            })
            .await?;

        info!("user {} signed up as {:?}", user.email, user.role);
        self.email_quietly("welcome", &user).await;

        Ok(user)
    }

    async fn log_in(&self, email: &str) -> AppResult<User> {
        self.repo
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {email}")))
    }

    async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        match self.repo.find_user_by_email(email).await? {
            Some(user) => self.email_quietly("reset-password", &user).await,
            None => info!("password reset requested for unknown email"),
        }

        Ok(())
    }
}

#[injectable(ConversationService)]
pub struct DbConversationService {
    repo: Ref<dyn ConversationRepository>,
    hub: Ref<ChatHub>,
}

impl DbConversationService {
    async fn accessible(&self, caller: &User, conversation_id: Uuid) -> AppResult<Conversation> {
        let conversation = self
            .repo
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("conversation {conversation_id}")))?;

        if is_owner_or_admin(caller, &conversation.user_email) {
            Ok(conversation)
        } else {
            Err(AppError::Forbidden(
                "not a participant of this conversation".to_owned(),
            ))
        }
    }
}

#[async_trait]
impl ConversationService for DbConversationService {
    async fn list_conversations(&self, caller: &User) -> AppResult<Vec<Conversation>> {
        let owner = (!caller.is_admin()).then_some(caller.email.as_str());
        Ok(self.repo.list_conversations(owner).await?)
    }

    async fn create_conversation(&self, caller: &User) -> AppResult<Conversation> {
        Ok(self
            .repo
            .create_conversation(Conversation {
                id: Uuid::new_v4(),
                user_email: caller.email.clone(),
                created_at: Utc::now(),
            })
            .await?)
    }

    async fn delete_conversation(&self, caller: &User, conversation_id: Uuid) -> AppResult<()> {
        self.accessible(caller, conversation_id).await?;
        self.repo.delete_conversation(conversation_id).await?;
        self.hub.close(conversation_id);
        Ok(())
    }

    async fn list_messages(&self, caller: &User, conversation_id: Uuid) -> AppResult<Vec<Message>> {
        self.accessible(caller, conversation_id).await?;
        Ok(self.repo.list_conversation_messages(conversation_id).await?)
    }

    async fn create_raw_message(
        &self,
        caller: &User,
        conversation_id: Uuid,
        kind: MessageKind,
        content: String,
    ) -> AppResult<Message> {
        self.accessible(caller, conversation_id).await?;

        let text = content.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest("message text is empty".to_owned()));
        }

        let message = self
            .repo
            .create_message_in_conversation(Message {
                id: Uuid::new_v4(),
                conversation_id,
                sender_email: caller.email.clone(),
                kind,
                created_at: Utc::now(),
                text: text.to_owned(),
            })
            .await?;

        self.hub.publish(&message);
        Ok(message)
    }

    async fn subscribe(
        &self,
        caller: &User,
        conversation_id: Uuid,
    ) -> AppResult<broadcast::Receiver<Message>> {
        self.accessible(caller, conversation_id).await?;
        Ok(self.hub.subscribe(conversation_id))
    }
}

#[injectable(EmailService)]
pub struct DbEmailService {
    repo: Ref<dyn EmailTemplateRepository>,
}

impl DbEmailService {
    async fn find(&self, name: &str) -> AppResult<EmailTemplate> {
        self.repo
            .find_template(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("email template `{name}`")))
    }
}

#[async_trait]
impl EmailService for DbEmailService {
    async fn list_templates(&self, caller: &User) -> AppResult<Vec<EmailTemplate>> {
        require_admin(caller)?;
        Ok(self.repo.list_templates().await?)
    }

    async fn get_template(&self, caller: &User, name: &str) -> AppResult<EmailTemplate> {
        require_admin(caller)?;
        self.find(name).await
    }

    async fn save_template(
        &self,
        caller: &User,
        name: String,
        subject: String,
        body: String,
    ) -> AppResult<EmailTemplate> {
        require_admin(caller)?;
        templates::check_syntax(&subject)?;
        templates::check_syntax(&body)?;

        let template = self
            .repo
            .upsert_template(EmailTemplate {
                name,
                subject,
                body,
                updated_at: Utc::now(),
            })
            .await?;

        info!("email template `{}` saved by {}", template.name, caller.email);
        Ok(template)
    }

    async fn preview(
        &self,
        caller: &User,
        name: &str,
        context: serde_json::Value,
    ) -> AppResult<RenderedEmail> {
        require_admin(caller)?;
        let template = self.find(name).await?;

        Ok(templates::render(&template, context)?)
    }

    async fn list_outbox(&self, caller: &User) -> AppResult<Vec<OutboxEmail>> {
        require_admin(caller)?;
        Ok(self.repo.list_outbox().await?)
    }

    async fn send(
        &self,
        template: &str,
        recipient: &str,
        context: minijinja::Value,
    ) -> AppResult<OutboxEmail> {
        let rendered = templates::render(&self.find(template).await?, context)?;

        let email = self
            .repo
            .enqueue_email(OutboxEmail {
                id: Uuid::new_v4(),
                recipient: recipient.to_owned(),
                subject: rendered.subject,
                body: rendered.body,
                created_at: Utc::now(),
            })
            .await?;

        info!("queued `{template}` email for {recipient}");
        Ok(email)
    }
}

#[injectable(NotificationService)]
pub struct DbNotificationService {
    repo: Ref<dyn NotificationRepository>,
}

#[async_trait]
impl NotificationService for DbNotificationService {
    async fn list_notifications(&self, caller: &User) -> AppResult<Vec<Notification>> {
        Ok(self.repo.list_notifications(&caller.email).await?)
    }

    async fn mark_read(&self, caller: &User, notification_id: Uuid) -> AppResult<Notification> {
        self.repo
            .mark_read(notification_id, &caller.email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("notification {notification_id}")))
    }

    async fn notify(&self, user_email: &str, message: String) -> AppResult<Notification> {
        Ok(self
            .repo
            .create_notification(Notification {
                id: Uuid::new_v4(),
                user_email: user_email.to_owned(),
                message,
                is_read: false,
                created_at: Utc::now(),
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 21)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".to_owned(),
            email: "ada@example.com".to_owned(),
            role,
            joined_at: Utc::now(),
            phone: None,
        }
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(at(9, 0), at(10, 30)).is_ok());
        assert!(matches!(
            validate_range(at(10, 0), at(10, 0)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_range(at(9, 15), at(10, 0)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_range(at(6, 30), at(7, 30)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_range(at(9, 0), at(9, 0) + chrono::Duration::days(1)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_permissions() {
        let admin = user(Role::Admin);
        let member = user(Role::User);

        assert!(require_admin(&admin).is_ok());
        assert!(matches!(
            require_admin(&member),
            Err(AppError::Forbidden(_))
        ));
        assert!(is_owner_or_admin(&member, "ada@example.com"));
        assert!(!is_owner_or_admin(&member, "grace@example.com"));
        assert!(is_owner_or_admin(&admin, "grace@example.com"));
    }
}
