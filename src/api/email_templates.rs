//! Email template and outbox endpoints. Admin only.

use crate::api::{ExtractUser, Path, ValidJson};
use crate::core::templates::RenderedEmail;
use crate::core::traits::{EmailService, UserService};
use crate::error::AppResult;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route("/:name", get(get_template).put(update_template))
        .route("/:name/preview", post(preview_template))
}

pub fn outbox_router() -> Router {
    Router::new().route("/", get(list_outbox))
}

async fn list_templates(
    Inject(user_service): Inject<dyn UserService>,
    Inject(email_service): Inject<dyn EmailService>,
    ExtractUser(email): ExtractUser,
) -> AppResult<Json<schemas::TemplateList>> {
    let caller = user_service.resolve_caller(&email).await?;
    let templates = email_service.list_templates(&caller).await?;

    Ok(Json(schemas::TemplateList {
        templates: templates
            .into_iter()
            .map(schemas::EmailTemplate::from)
            .collect(),
    }))
}

async fn get_template(
    Inject(user_service): Inject<dyn UserService>,
    Inject(email_service): Inject<dyn EmailService>,
    ExtractUser(email): ExtractUser,
    Path(name): Path<String>,
) -> AppResult<Json<schemas::EmailTemplate>> {
    let caller = user_service.resolve_caller(&email).await?;
    let template = email_service.get_template(&caller, &name).await?;

    Ok(Json(template.into()))
}

async fn create_template(
    Inject(user_service): Inject<dyn UserService>,
    Inject(email_service): Inject<dyn EmailService>,
    ExtractUser(email): ExtractUser,
    ValidJson(input): ValidJson<schemas::NewTemplate>,
) -> AppResult<(StatusCode, Json<schemas::EmailTemplate>)> {
    let caller = user_service.resolve_caller(&email).await?;
    let template = email_service
        .save_template(&caller, input.name, input.subject, input.body)
        .await?;

    Ok((StatusCode::CREATED, Json(template.into())))
}

async fn update_template(
    Inject(user_service): Inject<dyn UserService>,
    Inject(email_service): Inject<dyn EmailService>,
    ExtractUser(email): ExtractUser,
    Path(name): Path<String>,
    ValidJson(input): ValidJson<schemas::TemplateContent>,
) -> AppResult<Json<schemas::EmailTemplate>> {
    let caller = user_service.resolve_caller(&email).await?;
    let template = email_service
        .save_template(&caller, name, input.subject, input.body)
        .await?;

    Ok(Json(template.into()))
}

async fn preview_template(
    Inject(user_service): Inject<dyn UserService>,
    Inject(email_service): Inject<dyn EmailService>,
    ExtractUser(email): ExtractUser,
    Path(name): Path<String>,
    Json(context): Json<serde_json::Value>,
) -> AppResult<Json<RenderedEmail>> {
    let caller = user_service.resolve_caller(&email).await?;
    let rendered = email_service.preview(&caller, &name, context).await?;

    Ok(Json(rendered))
}

async fn list_outbox(
    Inject(user_service): Inject<dyn UserService>,
    Inject(email_service): Inject<dyn EmailService>,
    ExtractUser(email): ExtractUser,
) -> AppResult<Json<schemas::Outbox>> {
    let caller = user_service.resolve_caller(&email).await?;
    let emails = email_service.list_outbox(&caller).await?;

    Ok(Json(schemas::Outbox {
        emails: emails.into_iter().map(schemas::OutboxEmail::from).collect(),
    }))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;
    use validator::Validate;

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct EmailTemplate {
        pub name: String,
        pub subject: String,
        pub body: String,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::EmailTemplate> for EmailTemplate {
        fn from(template: entities::EmailTemplate) -> Self {
            EmailTemplate {
                name: template.name,
                subject: template.subject,
                body: template.body,
                updated_at: template.updated_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct TemplateList {
        pub templates: Vec<EmailTemplate>,
    }

    #[derive(Deserialize, Debug, Validate)]
    pub struct NewTemplate {
        #[validate(length(min = 1, max = 100))]
        pub name: String,
        #[validate(length(min = 1, max = 300))]
        pub subject: String,
        #[validate(length(min = 1))]
        pub body: String,
    }

    #[derive(Deserialize, Debug, Validate)]
    pub struct TemplateContent {
        #[validate(length(min = 1, max = 300))]
        pub subject: String,
        #[validate(length(min = 1))]
        pub body: String,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct OutboxEmail {
        pub id: Uuid,
        pub recipient: String,
        pub subject: String,
        pub body: String,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::OutboxEmail> for OutboxEmail {
        fn from(email: entities::OutboxEmail) -> Self {
            OutboxEmail {
                id: email.id,
                recipient: email.recipient,
                subject: email.subject,
                body: email.body,
                created_at: email.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct Outbox {
        pub emails: Vec<OutboxEmail>,
    }
}
