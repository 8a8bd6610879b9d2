//! Booking endpoints

use crate::api::{ExtractUser, Path, Query, ValidJson};
use crate::core::traits::{BookingService, UserService};
use crate::error::{AppError, AppResult};
use crate::infrastructure::traits::BookingFilter;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route("/:id", patch(update_booking).delete(cancel_booking))
}

async fn list_bookings(
    Inject(user_service): Inject<dyn UserService>,
    Inject(booking_service): Inject<dyn BookingService>,
    ExtractUser(email): ExtractUser,
    Query(query): Query<schemas::BookingQuery>,
) -> AppResult<Json<schemas::BookingList>> {
    let caller = user_service.resolve_caller(&email).await?;
    let bookings = booking_service
        .list_bookings(
            &caller,
            BookingFilter {
                id: query.id,
                location_id: query.location_id,
                user_email: query.user_email,
            },
        )
        .await?;

    Ok(Json(schemas::BookingList {
        bookings: bookings.into_iter().map(schemas::Booking::from).collect(),
    }))
}

async fn create_booking(
    Inject(user_service): Inject<dyn UserService>,
    Inject(booking_service): Inject<dyn BookingService>,
    ExtractUser(email): ExtractUser,
    ValidJson(input): ValidJson<schemas::CreateBooking>,
) -> AppResult<(StatusCode, Json<schemas::Booking>)> {
    let caller = user_service.resolve_caller(&email).await?;
    let booking = booking_service
        .create_booking(&caller, input.into())
        .await?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// Either decides on the booking (`status`) or moves it (`startTime` and
/// `endTime`), never both.
async fn update_booking(
    Inject(user_service): Inject<dyn UserService>,
    Inject(booking_service): Inject<dyn BookingService>,
    ExtractUser(email): ExtractUser,
    Path(booking_id): Path<Uuid>,
    ValidJson(input): ValidJson<schemas::UpdateBooking>,
) -> AppResult<Json<schemas::Booking>> {
    let caller = user_service.resolve_caller(&email).await?;

    let booking = match input {
        schemas::UpdateBooking {
            status: Some(status),
            start_time: None,
            end_time: None,
        } => {
            booking_service
                .update_status(&caller, booking_id, status)
                .await?
        }
        schemas::UpdateBooking {
            status: None,
            start_time: Some(start_time),
            end_time: Some(end_time),
        } => {
            booking_service
                .reschedule(&caller, booking_id, start_time, end_time)
                .await?
        }
        _ => {
            return Err(AppError::BadRequest(
                "send either `status`, or both `startTime` and `endTime`".to_owned(),
            ));
        }
    };

    Ok(Json(booking.into()))
}

async fn cancel_booking(
    Inject(user_service): Inject<dyn UserService>,
    Inject(booking_service): Inject<dyn BookingService>,
    ExtractUser(email): ExtractUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let caller = user_service.resolve_caller(&email).await?;
    booking_service.cancel(&caller, booking_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub mod schemas {
    use crate::core::traits::BookingDraft;
    use crate::infrastructure::entities::{self, BookingStatus};
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;
    use validator::Validate;

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct BookingQuery {
        pub id: Option<Uuid>,
        pub location_id: Option<Uuid>,
        pub user_email: Option<String>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
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

    impl From<entities::Booking> for Booking {
        fn from(booking: entities::Booking) -> Self {
            Booking {
                id: booking.id,
                location_id: booking.location_id,
                user_email: booking.user_email,
                start_time: booking.start_time,
                end_time: booking.end_time,
                status: booking.status,
                department: booking.department,
                occasion: booking.occasion,
                created_at: booking.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct BookingList {
        pub bookings: Vec<Booking>,
    }

    #[derive(Deserialize, Debug, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateBooking {
        pub location_id: Uuid,
        pub start_time: NaiveDateTime,
        pub end_time: NaiveDateTime,
        #[serde(default)]
        #[validate(length(max = 200))]
        pub department: String,
        #[serde(default)]
        #[validate(length(max = 500))]
        pub occasion: String,
    }

    impl From<CreateBooking> for BookingDraft {
        fn from(input: CreateBooking) -> Self {
            BookingDraft {
                location_id: input.location_id,
                start_time: input.start_time,
                end_time: input.end_time,
                department: input.department,
                occasion: input.occasion,
            }
        }
    }

    #[derive(Deserialize, Debug, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct UpdateBooking {
        pub status: Option<BookingStatus>,
        pub start_time: Option<NaiveDateTime>,
        pub end_time: Option<NaiveDateTime>,
    }
}
