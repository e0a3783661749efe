use axum::async_trait;
use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::handlers::ApiError;
use super::handlers::UNAUTHENTICATED;
use crate::domain::user::models::UserId;

/// JSON body whose rejections (bad syntax, missing fields, wrong content type)
/// become `400 {"error": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Verified token subject, placed in request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject(pub String);

/// Identity of the caller on protected routes.
///
/// Rejects with 401 when the subject is absent or not a user id, even if the
/// middleware ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let subject = parts
            .extensions
            .get::<AuthenticatedSubject>()
            .ok_or_else(|| {
                tracing::warn!("No authenticated subject in request");
                ApiError::Unauthorized(UNAUTHENTICATED.to_string())
            })?;

        UserId::from_string(&subject.0)
            .map(CurrentUser)
            .map_err(|e| {
                tracing::warn!(error = %e, "Token subject is not a user id");
                ApiError::Unauthorized(UNAUTHENTICATED.to_string())
            })
    }
}
