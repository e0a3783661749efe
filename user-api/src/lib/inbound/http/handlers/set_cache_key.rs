use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::cache::errors::CacheError;
use crate::domain::cache::models::CacheKey;
use crate::inbound::http::extractors::JsonBody;
use crate::inbound::http::router::AppState;

pub async fn set_cache_key(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SetCacheKeyRequest>,
) -> Result<ApiSuccess<SetCacheKeyResponseData>, ApiError> {
    let key = CacheKey::new(body.key).map_err(CacheError::from)?;

    state.cache_service.set_key(&key, &body.value).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        SetCacheKeyResponseData {
            message: "key set successfully".to_string(),
            key: key.as_str().to_string(),
            value: body.value,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SetCacheKeyRequest {
    key: String,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetCacheKeyResponseData {
    pub message: String,
    pub key: String,
    pub value: String,
}
