//! Support chat endpoints

use crate::api::{ExtractUser, Path, Query, ValidJson};
use crate::core::traits::{ConversationService, UserService};
use crate::error::AppResult;
use async_stream::stream;
use axum::http::StatusCode;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::{delete, get};
use axum::{Json, Router};
use di_axum::Inject;
use futures_util::Stream;
use log::{debug, warn};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route(
            "/conversations",
            get(list_conversations).post(new_conversation),
        )
        .route("/conversations/:id", delete(delete_conversation))
        .route("/conversations/:id/stream", get(stream_messages))
        .route("/messages", get(conversation_messages).post(post_message))
}

async fn list_conversations(
    Inject(user_service): Inject<dyn UserService>,
    Inject(conversation_service): Inject<dyn ConversationService>,
    ExtractUser(email): ExtractUser,
) -> AppResult<Json<schemas::ConversationList>> {
    let caller = user_service.resolve_caller(&email).await?;
    let conversations = conversation_service.list_conversations(&caller).await?;

    Ok(Json(schemas::ConversationList {
        conversations: conversations
            .into_iter()
            .map(schemas::Conversation::from)
            .collect(),
    }))
}

async fn new_conversation(
    Inject(user_service): Inject<dyn UserService>,
    Inject(conversation_service): Inject<dyn ConversationService>,
    ExtractUser(email): ExtractUser,
) -> AppResult<(StatusCode, Json<schemas::Conversation>)> {
    let caller = user_service.resolve_caller(&email).await?;
    let conversation = conversation_service.create_conversation(&caller).await?;

    Ok((StatusCode::CREATED, Json(conversation.into())))
}

async fn delete_conversation(
    Inject(user_service): Inject<dyn UserService>,
    Inject(conversation_service): Inject<dyn ConversationService>,
    ExtractUser(email): ExtractUser,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let caller = user_service.resolve_caller(&email).await?;
    conversation_service
        .delete_conversation(&caller, conversation_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn conversation_messages(
    Inject(user_service): Inject<dyn UserService>,
    Inject(conversation_service): Inject<dyn ConversationService>,
    ExtractUser(email): ExtractUser,
    Query(query): Query<schemas::MessagesQuery>,
) -> AppResult<Json<schemas::MessagesList>> {
    let caller = user_service.resolve_caller(&email).await?;
    let messages = conversation_service
        .list_messages(&caller, query.conversation_id)
        .await?;

    Ok(Json(schemas::MessagesList {
        messages: messages.into_iter().map(schemas::Message::from).collect(),
    }))
}

async fn post_message(
    Inject(user_service): Inject<dyn UserService>,
    Inject(conversation_service): Inject<dyn ConversationService>,
    ExtractUser(email): ExtractUser,
    ValidJson(message): ValidJson<schemas::CreateMessage>,
) -> AppResult<(StatusCode, Json<schemas::Message>)> {
    let caller = user_service.resolve_caller(&email).await?;
    let message = conversation_service
        .post_message(&caller, message.conversation_id, message.text)
        .await?;

    Ok((StatusCode::CREATED, Json(message.into())))
}

/// Server-sent `new_message` events for every message posted after the
/// subscription.
async fn stream_messages(
    Inject(user_service): Inject<dyn UserService>,
    Inject(conversation_service): Inject<dyn ConversationService>,
    ExtractUser(email): ExtractUser,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let caller = user_service.resolve_caller(&email).await?;
    let mut receiver = conversation_service
        .subscribe(&caller, conversation_id)
        .await?;

    let stream = stream! {
        loop {
            match receiver.recv().await {
                Ok(message) => {
                    match Event::default()
                        .event("new_message")
                        .json_data(schemas::Message::from(message))
                    {
                        Ok(event) => yield Ok(event),
                        Err(e) => warn!("failed to encode chat message: {e}"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("chat stream of {conversation_id} skipped {skipped} messages");
                }
                Err(RecvError::Closed) => {
                    debug!("chat stream of {conversation_id} closed");
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;
    use validator::Validate;

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Conversation {
        pub id: Uuid,
        pub user_email: String,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Conversation> for Conversation {
        fn from(conversation: entities::Conversation) -> Self {
            Conversation {
                id: conversation.id,
                user_email: conversation.user_email,
                created_at: conversation.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ConversationList {
        pub conversations: Vec<Conversation>,
    }

    #[derive(Serialize, Debug, Default)]
    pub struct MessagesList {
        pub messages: Vec<Message>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "lowercase")]
    pub enum MessageKind {
        User,
        Admin,
    }

    impl From<entities::MessageKind> for MessageKind {
        fn from(kind: entities::MessageKind) -> Self {
            match kind {
                entities::MessageKind::User => MessageKind::User,
                entities::MessageKind::Admin => MessageKind::Admin,
            }
        }
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Message {
        pub conversation_id: Uuid,
        pub id: Uuid,
        pub sender_email: String,
        pub kind: MessageKind,
        pub text: String,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Message> for Message {
        fn from(message: entities::Message) -> Self {
            Message {
                conversation_id: message.conversation_id,
                id: message.id,
                sender_email: message.sender_email,
                kind: message.kind.into(),
                text: message.text,
                created_at: message.created_at,
            }
        }
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagesQuery {
        pub conversation_id: Uuid,
    }

    #[derive(Deserialize, Debug, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateMessage {
        pub conversation_id: Uuid,
        #[validate(length(min = 1, max = 4000))]
        pub text: String,
    }
}
