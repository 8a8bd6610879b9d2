//! Profile side of sign-up, log-in and password reset.
//!
//! Credentials are checked by the identity provider; these endpoints only keep
//! the user profiles and their emails in step with it. Sign-up and log-in act
//! on the email the gateway asserted for the caller and nothing else.

use crate::api::users::schemas::User;
use crate::api::{ExtractUser, ValidJson};
use crate::core::traits::{SignUp, UserService};
use crate::error::{AppError, AppResult};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/login", post(log_in))
        .route("/reset-password", post(reset_password))
}

async fn sign_up(
    Inject(user_service): Inject<dyn UserService>,
    ExtractUser(email): ExtractUser,
    ValidJson(input): ValidJson<schemas::SignUp>,
) -> AppResult<(StatusCode, Json<User>)> {
    if let Some(requested) = &input.email {
        if !requested.trim().eq_ignore_ascii_case(&email) {
            return Err(AppError::Forbidden(
                "a profile can only be created for the signed-in email".to_owned(),
            ));
        }
    }

    let user = user_service
        .sign_up(SignUp {
            name: input.name,
            email,
            phone: input.phone,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn log_in(
    Inject(user_service): Inject<dyn UserService>,
    ExtractUser(email): ExtractUser,
) -> AppResult<Json<User>> {
    let user = user_service.log_in(&email).await?;
    Ok(Json(user.into()))
}

async fn reset_password(
    Inject(user_service): Inject<dyn UserService>,
    ValidJson(input): ValidJson<schemas::EmailOnly>,
) -> AppResult<StatusCode> {
    user_service
        .request_password_reset(input.email.trim())
        .await?;

    Ok(StatusCode::ACCEPTED)
}

pub mod schemas {
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Deserialize, Debug, Validate)]
    pub struct SignUp {
        #[validate(length(min = 1, max = 200))]
        pub name: String,
        #[validate(email)]
        pub email: Option<String>,
        #[validate(length(max = 50))]
        pub phone: Option<String>,
    }

    #[derive(Deserialize, Debug, Validate)]
    pub struct EmailOnly {
        #[validate(email)]
        pub email: String,
    }
}
