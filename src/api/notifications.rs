//! Notifications of the caller

use crate::api::{ExtractUser, Path};
use crate::core::traits::{NotificationService, UserService};
use crate::error::AppResult;
use axum::routing::{get, patch};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:id", patch(mark_read))
}

async fn list_notifications(
    Inject(user_service): Inject<dyn UserService>,
    Inject(notification_service): Inject<dyn NotificationService>,
    ExtractUser(email): ExtractUser,
) -> AppResult<Json<schemas::NotificationList>> {
    let caller = user_service.resolve_caller(&email).await?;
    let notifications = notification_service.list_notifications(&caller).await?;

    Ok(Json(schemas::NotificationList {
        notifications: notifications
            .into_iter()
            .map(schemas::Notification::from)
            .collect(),
    }))
}

async fn mark_read(
    Inject(user_service): Inject<dyn UserService>,
    Inject(notification_service): Inject<dyn NotificationService>,
    ExtractUser(email): ExtractUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<schemas::Notification>> {
    let caller = user_service.resolve_caller(&email).await?;
    let notification = notification_service
        .mark_read(&caller, notification_id)
        .await?;

    Ok(Json(notification.into()))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::Serialize;
    use uuid::Uuid;

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Notification {
        pub id: Uuid,
        pub user_email: String,
        pub message: String,
        pub is_read: bool,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Notification> for Notification {
        fn from(notification: entities::Notification) -> Self {
            Notification {
                id: notification.id,
                user_email: notification.user_email,
                message: notification.message,
                is_read: notification.is_read,
                created_at: notification.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct NotificationList {
        pub notifications: Vec<Notification>,
    }
}
