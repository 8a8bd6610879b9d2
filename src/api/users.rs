//! User profile endpoints

use crate::api::{ExtractUser, Path, ValidJson};
use crate::core::traits::UserService;
use crate::error::AppResult;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new().route("/", get(list_users)).route(
        "/:id",
        get(get_user).patch(update_user).delete(delete_user),
    )
}

async fn list_users(
    Inject(user_service): Inject<dyn UserService>,
    ExtractUser(email): ExtractUser,
) -> AppResult<Json<schemas::UserList>> {
    let caller = user_service.resolve_caller(&email).await?;
    let users = user_service.list_users(&caller).await?;

    Ok(Json(schemas::UserList {
        users: users.into_iter().map(schemas::User::from).collect(),
    }))
}

async fn get_user(
    Inject(user_service): Inject<dyn UserService>,
    ExtractUser(email): ExtractUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<schemas::User>> {
    let caller = user_service.resolve_caller(&email).await?;
    let user = user_service.get_user(&caller, user_id).await?;

    Ok(Json(user.into()))
}

async fn update_user(
    Inject(user_service): Inject<dyn UserService>,
    ExtractUser(email): ExtractUser,
    Path(user_id): Path<Uuid>,
    ValidJson(input): ValidJson<schemas::UpdateUser>,
) -> AppResult<Json<schemas::User>> {
    let caller = user_service.resolve_caller(&email).await?;
    let user = user_service
        .update_user(&caller, user_id, input.into())
        .await?;

    Ok(Json(user.into()))
}

async fn delete_user(
    Inject(user_service): Inject<dyn UserService>,
    ExtractUser(email): ExtractUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let caller = user_service.resolve_caller(&email).await?;
    user_service.delete_user(&caller, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub mod schemas {
    use crate::core::traits::UserPatch;
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;
    use validator::Validate;

    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        User,
        Admin,
    }

    impl From<entities::Role> for Role {
        fn from(role: entities::Role) -> Self {
            match role {
                entities::Role::User => Role::User,
                entities::Role::Admin => Role::Admin,
            }
        }
    }

    impl From<Role> for entities::Role {
        fn from(role: Role) -> Self {
            match role {
                Role::User => entities::Role::User,
                Role::Admin => entities::Role::Admin,
            }
        }
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct User {
        pub id: Uuid,
        pub name: String,
        pub email: String,
        pub role: Role,
        pub joined_at: DateTime<Utc>,
        pub phone: Option<String>,
    }

    impl From<entities::User> for User {
        fn from(user: entities::User) -> Self {
            User {
                id: user.id,
                name: user.name,
                email: user.email,
                role: user.role.into(),
                joined_at: user.joined_at,
                phone: user.phone,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct UserList {
        pub users: Vec<User>,
    }

    /// Email is immutable; unknown fields, `email` included, are rejected.
    #[derive(Deserialize, Debug, Validate)]
    #[serde(deny_unknown_fields)]
    pub struct UpdateUser {
        #[validate(length(min = 1, max = 200))]
        pub name: Option<String>,
        #[validate(length(max = 50))]
        pub phone: Option<String>,
        pub role: Option<Role>,
    }

    impl From<UpdateUser> for UserPatch {
        fn from(input: UpdateUser) -> Self {
            UserPatch {
                name: input.name,
                phone: input.phone,
                role: input.role.map(entities::Role::from),
            }
        }
    }
}
