//! Database entities

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

/// A reservable unit kind at a location, e.g. a meeting room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookableItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub image_url: String,
    pub items: Json<Vec<BookableItem>>,
    pub amenities: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
}

/// Start and end are wall-clock times at the location.
#[derive(Debug, Clone, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub location_id: Uuid,
    pub user_email: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: BookingStatus,
    pub department: String,
    pub occasion: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
    pub phone: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(u8)]
pub enum MessageKind {
    User = 1,
    Admin = 2,
}

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_email: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct EmailTemplate {
    pub name: String,
    pub subject: String,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_email: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A rendered email waiting for the external relay.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxEmail {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
