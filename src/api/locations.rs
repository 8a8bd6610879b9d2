//! Location endpoints

use crate::api::{ExtractUser, Path, Query, ValidJson};
use crate::core::availability::DateRange;
use crate::core::traits::{BookingService, LocationService, UserService};
use crate::error::{AppError, AppResult};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveTime;
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route(
            "/:id",
            get(get_location)
                .put(update_location)
                .delete(delete_location),
        )
        .route("/:id/availability", get(location_availability))
}

async fn list_locations(
    Inject(location_service): Inject<dyn LocationService>,
) -> AppResult<Json<schemas::LocationList>> {
    let locations = location_service.list_locations().await?;

    Ok(Json(schemas::LocationList {
        locations: locations
            .into_iter()
            .map(schemas::Location::from)
            .collect(),
    }))
}

async fn get_location(
    Inject(location_service): Inject<dyn LocationService>,
    Path(location_id): Path<Uuid>,
) -> AppResult<Json<schemas::Location>> {
    let location = location_service.get_location(location_id).await?;
    Ok(Json(location.into()))
}

async fn create_location(
    Inject(user_service): Inject<dyn UserService>,
    Inject(location_service): Inject<dyn LocationService>,
    ExtractUser(email): ExtractUser,
    ValidJson(input): ValidJson<schemas::LocationInput>,
) -> AppResult<(StatusCode, Json<schemas::Location>)> {
    let caller = user_service.resolve_caller(&email).await?;
    let location = location_service
        .create_location(&caller, input.into())
        .await?;

    Ok((StatusCode::CREATED, Json(location.into())))
}

async fn update_location(
    Inject(user_service): Inject<dyn UserService>,
    Inject(location_service): Inject<dyn LocationService>,
    ExtractUser(email): ExtractUser,
    Path(location_id): Path<Uuid>,
    ValidJson(input): ValidJson<schemas::LocationInput>,
) -> AppResult<Json<schemas::Location>> {
    let caller = user_service.resolve_caller(&email).await?;
    let location = location_service
        .update_location(&caller, location_id, input.into())
        .await?;

    Ok(Json(location.into()))
}

async fn delete_location(
    Inject(user_service): Inject<dyn UserService>,
    Inject(location_service): Inject<dyn LocationService>,
    ExtractUser(email): ExtractUser,
    Path(location_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let caller = user_service.resolve_caller(&email).await?;
    location_service
        .delete_location(&caller, location_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn location_availability(
    Inject(booking_service): Inject<dyn BookingService>,
    Path(location_id): Path<Uuid>,
    Query(query): Query<schemas::AvailabilityQuery>,
) -> AppResult<Json<schemas::Availability>> {
    let range = DateRange::new(query.from, query.to.unwrap_or(query.from))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let start = query
        .start
        .as_deref()
        .map(|start| {
            NaiveTime::parse_from_str(start, schemas::TIME_FORMAT)
                .map_err(|_| AppError::BadRequest(format!("`{start}` is not a HH:MM time")))
        })
        .transpose()?;

    let availability = booking_service
        .availability(location_id, range, start)
        .await?;

    Ok(Json(schemas::Availability::new(
        location_id,
        range,
        availability,
    )))
}

pub mod schemas {
    use crate::core::availability::DateRange;
    use crate::core::traits::{self, LocationDraft};
    use crate::infrastructure::entities::{self, BookableItem};
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;
    use validator::Validate;

    pub const TIME_FORMAT: &str = "%H:%M";

    fn label(time: NaiveTime) -> String {
        time.format(TIME_FORMAT).to_string()
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Location {
        pub id: Uuid,
        pub name: String,
        pub address: String,
        pub image_url: String,
        pub items: Vec<BookableItem>,
        pub amenities: Vec<String>,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Location> for Location {
        fn from(location: entities::Location) -> Self {
            Location {
                id: location.id,
                name: location.name,
                address: location.address,
                image_url: location.image_url,
                items: location.items.0,
                amenities: location.amenities.0,
                created_at: location.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct LocationList {
        pub locations: Vec<Location>,
    }

    #[derive(Deserialize, Debug, Validate)]
    pub struct BookableItemInput {
        #[serde(rename = "type")]
        #[validate(length(min = 1, max = 100))]
        pub kind: String,
        #[serde(default)]
        pub description: String,
        #[validate(range(min = 0.0))]
        pub price: f64,
    }

    #[derive(Deserialize, Debug, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct LocationInput {
        #[validate(length(min = 1, max = 200))]
        pub name: String,
        #[validate(length(min = 1, max = 500))]
        pub address: String,
        #[validate(url)]
        pub image_url: Option<String>,
        #[serde(default)]
        #[validate(nested)]
        pub items: Vec<BookableItemInput>,
        #[serde(default)]
        pub amenities: Vec<String>,
    }

    impl From<LocationInput> for LocationDraft {
        fn from(input: LocationInput) -> Self {
            LocationDraft {
                name: input.name,
                address: input.address,
                image_url: input.image_url.unwrap_or_default(),
                items: input
                    .items
                    .into_iter()
                    .map(|item| BookableItem {
                        kind: item.kind,
                        description: item.description,
                        price: item.price,
                    })
                    .collect(),
                amenities: input.amenities,
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct AvailabilityQuery {
        pub from: NaiveDate,
        pub to: Option<NaiveDate>,
        /// `HH:MM`; asks for the end options of this start.
        pub start: Option<String>,
    }

    #[derive(Serialize, Debug)]
    pub struct Slot {
        pub time: String,
        pub disabled: bool,
    }

    #[derive(Serialize, Debug)]
    pub struct Day {
        pub date: NaiveDate,
        pub slots: Vec<Slot>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Availability {
        pub location_id: Uuid,
        pub from: NaiveDate,
        pub to: NaiveDate,
        pub days: Vec<Day>,
        pub start_options: Vec<String>,
        pub end_options: Option<Vec<String>>,
    }

    impl Availability {
        pub fn new(location_id: Uuid, range: DateRange, availability: traits::Availability) -> Self {
            Availability {
                location_id,
                from: range.from(),
                to: range.to(),
                days: availability
                    .days
                    .into_iter()
                    .map(|day| Day {
                        date: day.date,
                        slots: day
                            .slots
                            .into_iter()
                            .map(|slot| Slot {
                                time: label(slot.time),
                                disabled: slot.disabled,
                            })
                            .collect(),
                    })
                    .collect(),
                start_options: availability.start_options.into_iter().map(label).collect(),
                end_options: availability
                    .end_options
                    .map(|options| options.into_iter().map(label).collect()),
            }
        }
    }
}
