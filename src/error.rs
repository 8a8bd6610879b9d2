//! Request-level error type.
//!
//! Every handler returns [`AppResult`]; the error is rendered as a JSON
//! `{ "message": ... }` body with a matching status code.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// SQLITE_BUSY, SQLITE_LOCKED and SQLITE_BUSY_SNAPSHOT: another writer held
/// the database past the busy timeout.
fn is_busy(e: &dyn sqlx::error::DatabaseError) -> bool {
    matches!(e.code().as_deref(), Some("5" | "6" | "517"))
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("invalid input: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("invalid request body: {0}")]
    JsonRejection(#[from] JsonRejection),

    #[error("invalid path: {0}")]
    PathRejection(#[from] PathRejection),

    #[error("invalid query: {0}")]
    QueryRejection(#[from] QueryRejection),

    #[error("{0}")]
    BadRequest(String),

    #[error("missing `X-User-Email` header")]
    Unauthenticated,

    #[error("unknown user `{0}`")]
    UnknownCaller(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Database(sqlx::Error::Database(e))
                if e.is_unique_violation() || is_busy(&**e) =>
            {
                StatusCode::CONFLICT
            }
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PathRejection(e) => e.status(),
            AppError::Template(_)
            | AppError::Validation(_)
            | AppError::JsonRejection(_)
            | AppError::QueryRejection(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::UnknownCaller(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    pub fn forbidden() -> Self {
        AppError::Forbidden("admin role required".to_owned())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(sqlx::Error::RowNotFound) => "Not Found".to_owned(),
            AppError::Database(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                "Record already exists".to_owned()
            }
            AppError::Database(sqlx::Error::Database(e)) if is_busy(&**e) => {
                "The database is busy, try again".to_owned()
            }
            AppError::Database(e) => {
                error!("Database error: {e:#?}");
                "Internal Error".to_owned()
            }
            AppError::Validation(e) => {
                format!("Input validation error: [{e}]").replace('\n', ", ")
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::NotFound("booking".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("overlap".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let response = AppError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal Error");
    }

    #[tokio::test]
    async fn test_rejections_render_as_json() {
        use axum::extract::{FromRequestParts, Query};
        use axum::http::Request;

        #[derive(serde::Deserialize, Debug)]
        #[allow(dead_code)]
        struct Range {
            from: String,
        }

        let (mut parts, _) = Request::builder()
            .uri("/availability?to=2026-10-21")
            .body(())
            .unwrap()
            .into_parts();
        let rejection = Query::<Range>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();

        let response = AppError::from(rejection).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["message"].as_str().unwrap().contains("from"));
    }
}
