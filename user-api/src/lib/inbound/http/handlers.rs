use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::cache::errors::CacheError;
use crate::user::errors::UserError;

pub mod change_password;
pub mod get_cache_key;
pub mod health;
pub mod login;
pub mod profile;
pub mod register;
pub mod set_cache_key;

/// Message returned for every authentication failure on protected routes.
pub const UNAUTHENTICATED: &str = "invalid or missing token";

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<T>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(data))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Body of every `{"message": ...}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageResponseData {
    pub message: String,
}

impl MessageResponseData {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        (status, Json(ApiErrorData { error: message })).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::InvalidName(_)
            | UserError::InvalidEmail(_)
            | UserError::InvalidPassword(_)
            | UserError::InvalidUserId(_) => ApiError::BadRequest(err.to_string()),
            UserError::EmailAlreadyExists => ApiError::Conflict(err.to_string()),
            UserError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            // Only reachable from protected routes: the token names a user that is gone.
            UserError::NotFound(_) => ApiError::Unauthorized(UNAUTHENTICATED.to_string()),
            UserError::Password(_)
            | UserError::Token(_)
            | UserError::DatabaseError(_)
            | UserError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidKey(_) | CacheError::EmptyValue => {
                ApiError::BadRequest(err.to_string())
            }
            CacheError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CacheError::Unavailable(_) | CacheError::Timeout(_) => {
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::user::errors::DisplayNameError;

    #[test]
    fn test_user_error_mapping() {
        assert_eq!(
            ApiError::from(UserError::EmailAlreadyExists),
            ApiError::Conflict("user with this email already exists".to_string())
        );
        assert_eq!(
            ApiError::from(UserError::InvalidCredentials),
            ApiError::Unauthorized("invalid credentials".to_string())
        );
        assert_eq!(
            ApiError::from(UserError::NotFound("1".to_string())),
            ApiError::Unauthorized(UNAUTHENTICATED.to_string())
        );
        assert!(matches!(
            ApiError::from(UserError::InvalidName(DisplayNameError::Empty)),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(UserError::DatabaseError("down".to_string())),
            ApiError::InternalServerError(_)
        ));
    }

    #[test]
    fn test_cache_error_mapping() {
        assert_eq!(
            ApiError::from(CacheError::NotFound("k".to_string())),
            ApiError::NotFound("key not found".to_string())
        );
        assert!(matches!(
            ApiError::from(CacheError::Timeout(Duration::from_secs(3))),
            ApiError::InternalServerError(_)
        ));
        assert!(matches!(
            ApiError::from(CacheError::EmptyValue),
            ApiError::BadRequest(_)
        ));
    }

    #[test]
    fn test_internal_error_status() {
        let response = ApiError::InternalServerError("pool timed out".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
