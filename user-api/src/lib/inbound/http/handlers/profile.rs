use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageResponseData;
use crate::domain::user::models::DisplayName;
use crate::domain::user::models::UpdateProfileCommand;
use crate::inbound::http::extractors::CurrentUser;
use crate::inbound::http::extractors::JsonBody;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

pub async fn get_profile(
    CurrentUser(user_id): CurrentUser,
) -> Result<ApiSuccess<ProfileResponseData>, ApiError> {
    Ok(ApiSuccess::new(
        StatusCode::OK,
        ProfileResponseData {
            message: "this is a protected route".to_string(),
            user_id: user_id.0,
        },
    ))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(body): JsonBody<UpdateProfileRequest>,
) -> Result<ApiSuccess<MessageResponseData>, ApiError> {
    let command = UpdateProfileCommand {
        name: DisplayName::new(body.name).map_err(UserError::from)?,
    };

    state
        .auth_service
        .update_profile(&user_id, command)
        .await
        .map_err(ApiError::from)
        .map(|_| {
            ApiSuccess::new(
                StatusCode::OK,
                MessageResponseData::new("profile updated successfully"),
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileResponseData {
    pub message: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateProfileRequest {
    name: String,
}
