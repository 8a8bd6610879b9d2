use crate::error::AppError;
use crate::infrastructure::database::DatabaseConnection;
use async_trait::async_trait;
use axum::extract::{self, FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use validator::{Validate, ValidateEmail};

pub mod auth;
pub mod bookings;
pub mod chat;
pub mod email_templates;
pub mod locations;
pub mod notifications;
pub mod users;

const X_USER_EMAIL: &str = "X-User-Email";

/// Email of the caller, as asserted by the auth gateway in front of the
/// service.
#[derive(Debug)]
pub struct ExtractUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, AppError> {
        let Some(email) = parts.headers.get(X_USER_EMAIL) else {
            return Err(AppError::Unauthenticated);
        };

        let email = email
            .to_str()
            .map_err(|_| AppError::BadRequest("invalid `X-User-Email` header".to_owned()))?
            .trim();

        if !email.validate_email() {
            return Err(AppError::BadRequest(
                "invalid `X-User-Email` header".to_owned(),
            ));
        }

        Ok(ExtractUser(email.to_owned()))
    }
}

/// JSON body that passed its `validator` rules.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, AppError> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;

        Ok(ValidJson(value))
    }
}

/// Path parameters; a malformed segment is answered with a JSON error.
#[derive(Debug)]
pub struct Path<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, AppError> {
        let extract::Path(value) = extract::Path::<T>::from_request_parts(parts, state).await?;

        Ok(Path(value))
    }
}

/// Query string parameters; missing or malformed fields are answered with a
/// JSON error.
#[derive(Debug)]
pub struct Query<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, AppError> {
        let extract::Query(value) = extract::Query::<T>::from_request_parts(parts, state).await?;

        Ok(Query(value))
    }
}

pub fn router() -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/locations", locations::router())
        .nest("/bookings", bookings::router())
        .nest("/users", users::router())
        .nest("/email-templates", email_templates::router())
        .nest("/email-outbox", email_templates::outbox_router())
        .nest("/chat", chat::router())
        .nest("/notifications", notifications::router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
}

async fn health(Inject(database): Inject<DatabaseConnection>) -> Result<Json<Value>, AppError> {
    sqlx::query("SELECT 1").execute(&**database).await?;

    Ok(Json(json!({ "status": "ok" })))
}
