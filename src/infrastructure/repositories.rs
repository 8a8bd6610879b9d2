//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    Booking, BookingStatus, Conversation, EmailTemplate, Location, Message, Notification,
    OutboxEmail, Role, User,
};
use crate::infrastructure::traits::{
    BookingFilter, BookingRepository, BookingWrite, ConflictCheck, ConversationRepository,
    EmailTemplateRepository, LocationRepository, NotificationRepository, UserRepository,
};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::{debug, error};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

const APPROVED_AT_LOCATION: &str =
    "SELECT * FROM bookings WHERE location_id = ? AND status = 'approved' AND id != ?";

#[injectable(LocationRepository)]
pub struct DbLocationRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl LocationRepository for DbLocationRepository {
    async fn list_locations(&self) -> Result<Vec<Location>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM locations ORDER BY name ASC")
            .fetch_all(&**self.connection)
            .await
    }

    async fn find_location(&self, location_id: Uuid) -> Result<Option<Location>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM locations WHERE id = ?")
            .bind(location_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn create_location(&self, location: Location) -> Result<Location, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO locations (id, name, address, image_url, items, amenities, created_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(location.id)
        .bind(location.name)
        .bind(location.address)
        .bind(location.image_url)
        .bind(location.items)
        .bind(location.amenities)
        .bind(location.created_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn update_location(&self, location: Location) -> Result<Option<Location>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE locations SET name = ?, address = ?, image_url = ?, items = ?, amenities = ? WHERE id = ? RETURNING *",
        )
        .bind(location.name)
        .bind(location.address)
        .bind(location.image_url)
        .bind(location.items)
        .bind(location.amenities)
        .bind(location.id)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn delete_location(&self, location_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(location_id)
            .execute(&**self.connection)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[injectable(BookingRepository)]
pub struct DbBookingRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl BookingRepository for DbBookingRepository {
    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, sqlx::Error> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM bookings WHERE 1 = 1");

        if let Some(id) = filter.id {
            query.push(" AND id = ").push_bind(id);
        }
        if let Some(location_id) = filter.location_id {
            query.push(" AND location_id = ").push_bind(location_id);
        }
        if let Some(user_email) = &filter.user_email {
            query.push(" AND user_email = ").push_bind(user_email.clone());
        }
        query.push(" ORDER BY start_time ASC");

        query
            .build_query_as::<Booking>()
            .fetch_all(&**self.connection)
            .await
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(booking_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn insert_booking(
        &self,
        booking: Booking,
        replaces: Option<Uuid>,
        conflicts: ConflictCheck<'_>,
    ) -> Result<BookingWrite, sqlx::Error> {
        let mut tx = self.connection.begin_with("BEGIN IMMEDIATE").await?;

        if let Some(replaced) = replaces {
            let deleted = sqlx::query("DELETE FROM bookings WHERE id = ?")
                .bind(replaced)
                .execute(&mut *tx)
                .await?;

            if deleted.rows_affected() == 0 {
                return Err(sqlx::Error::RowNotFound);
            }
        }

        let approved: Vec<Booking> = sqlx::query_as(APPROVED_AT_LOCATION)
            .bind(booking.location_id)
            .bind(booking.id)
            .fetch_all(&mut *tx)
            .await?;

        if conflicts(&booking, &approved) {
            debug!("booking at {} conflicts, rolling back", booking.location_id);
            return Ok(BookingWrite::Conflict);
        }

        let inserted = sqlx::query_as(
            "INSERT INTO bookings (id, location_id, user_email, start_time, end_time, status, department, occasion, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(booking.id)
        .bind(booking.location_id)
        .bind(booking.user_email)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.status)
        .bind(booking.department)
        .bind(booking.occasion)
        .bind(booking.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.inspect_err(|e| error!("{e}"))?;

        Ok(BookingWrite::Written(inserted))
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        conflicts: ConflictCheck<'_>,
    ) -> Result<BookingWrite, sqlx::Error> {
        let mut tx = self.connection.begin_with("BEGIN IMMEDIATE").await?;

        let current: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let approved: Vec<Booking> = sqlx::query_as(APPROVED_AT_LOCATION)
            .bind(current.location_id)
            .bind(current.id)
            .fetch_all(&mut *tx)
            .await?;

        let target = Booking { status, ..current };
        if conflicts(&target, &approved) {
            return Ok(BookingWrite::Conflict);
        }

        let updated = sqlx::query_as("UPDATE bookings SET status = ? WHERE id = ? RETURNING *")
            .bind(status)
            .bind(booking_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await.inspect_err(|e| error!("{e}"))?;

        Ok(BookingWrite::Written(updated))
    }

    async fn delete_booking(&self, booking_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(booking_id)
            .execute(&**self.connection)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[injectable(UserRepository)]
pub struct DbUserRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl UserRepository for DbUserRepository {
    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users ORDER BY julianday(joined_at) ASC, rowid ASC")
            .fetch_all(&**self.connection)
            .await
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE role = ? ORDER BY email ASC")
            .bind(role)
            .fetch_all(&**self.connection)
            .await
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn create_user(&self, user: User) -> Result<User, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO users (id, name, email, role, joined_at, phone) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(user.id)
        .bind(user.name)
        .bind(user.email)
        .bind(user.role)
        .bind(user.joined_at)
        .bind(user.phone)
        .fetch_one(&**self.connection)
        .await
    }

    async fn update_user(&self, user: User) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE users SET name = ?, role = ?, phone = ? WHERE id = ? RETURNING *",
        )
        .bind(user.name)
        .bind(user.role)
        .bind(user.phone)
        .bind(user.id)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&**self.connection)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[injectable(ConversationRepository)]
pub struct DbConversationRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl ConversationRepository for DbConversationRepository {
    async fn list_conversations(
        &self,
        user_email: Option<&str>,
    ) -> Result<Vec<Conversation>, sqlx::Error> {
        match user_email {
            Some(user_email) => {
                sqlx::query_as(
                    "SELECT * FROM conversations WHERE user_email = ? ORDER BY julianday(created_at) ASC, rowid ASC",
                )
                .bind(user_email)
                .fetch_all(&**self.connection)
                .await
            }
            None => {
                sqlx::query_as(
                    "SELECT * FROM conversations ORDER BY julianday(created_at) ASC, rowid ASC",
                )
                .fetch_all(&**self.connection)
                .await
            }
        }
    }

    async fn find_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn create_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO conversations (id, user_email, created_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(conversation.id)
        .bind(conversation.user_email)
        .bind(conversation.created_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn delete_conversation(&self, conversation_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .execute(&**self.connection)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY julianday(created_at) ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&**self.connection)
        .await
    }

    async fn create_message_in_conversation(
        &self,
        message: Message,
    ) -> Result<Message, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO messages (id, conversation_id, sender_email, kind, created_at, text) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_email)
        .bind(message.kind)
        .bind(message.created_at)
        .bind(message.text)
        .fetch_one(&**self.connection)
        .await
    }
}

#[injectable(EmailTemplateRepository)]
pub struct DbEmailTemplateRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl EmailTemplateRepository for DbEmailTemplateRepository {
    async fn list_templates(&self) -> Result<Vec<EmailTemplate>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM email_templates ORDER BY name ASC")
            .fetch_all(&**self.connection)
            .await
    }

    async fn find_template(&self, name: &str) -> Result<Option<EmailTemplate>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM email_templates WHERE name = ?")
            .bind(name)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn upsert_template(&self, template: EmailTemplate) -> Result<EmailTemplate, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO email_templates (name, subject, body, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (name) DO UPDATE SET subject = excluded.subject, body = excluded.body, updated_at = excluded.updated_at \
             RETURNING *",
        )
        .bind(template.name)
        .bind(template.subject)
        .bind(template.body)
        .bind(template.updated_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn enqueue_email(&self, email: OutboxEmail) -> Result<OutboxEmail, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO email_outbox (id, recipient, subject, body, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(email.id)
        .bind(email.recipient)
        .bind(email.subject)
        .bind(email.body)
        .bind(email.created_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn list_outbox(&self) -> Result<Vec<OutboxEmail>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM email_outbox ORDER BY julianday(created_at) ASC, rowid ASC")
            .fetch_all(&**self.connection)
            .await
    }
}

#[injectable(NotificationRepository)]
pub struct DbNotificationRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl NotificationRepository for DbNotificationRepository {
    async fn list_notifications(&self, user_email: &str) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM notifications WHERE user_email = ? ORDER BY julianday(created_at) DESC, rowid DESC",
        )
        .bind(user_email)
        .fetch_all(&**self.connection)
        .await
    }

    async fn create_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO notifications (id, user_email, message, is_read, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(notification.id)
        .bind(notification.user_email)
        .bind(notification.message)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn mark_read(
        &self,
        notification_id: Uuid,
        user_email: &str,
    ) -> Result<Option<Notification>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE notifications SET is_read = TRUE WHERE id = ? AND user_email = ? RETURNING *",
        )
        .bind(notification_id)
        .bind(user_email)
        .fetch_optional(&**self.connection)
        .await
    }
}
