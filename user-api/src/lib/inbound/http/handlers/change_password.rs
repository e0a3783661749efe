use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageResponseData;
use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::NewPassword;
use crate::inbound::http::extractors::CurrentUser;
use crate::inbound::http::extractors::JsonBody;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> Result<ApiSuccess<MessageResponseData>, ApiError> {
    state
        .auth_service
        .change_password(&user_id, body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|_| {
            ApiSuccess::new(
                StatusCode::OK,
                MessageResponseData::new("password changed successfully"),
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

impl ChangePasswordRequest {
    fn try_into_command(self) -> Result<ChangePasswordCommand, ApiError> {
        if self.old_password.is_empty() {
            return Err(ApiError::BadRequest("old_password is required".to_string()));
        }

        Ok(ChangePasswordCommand {
            old_password: self.old_password,
            new_password: NewPassword::new(self.new_password).map_err(UserError::from)?,
        })
    }
}
