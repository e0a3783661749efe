use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::cache::errors::CacheError;
use crate::domain::cache::models::CacheKey;
use crate::inbound::http::router::AppState;

pub async fn get_cache_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<ApiSuccess<GetCacheKeyResponseData>, ApiError> {
    let key = CacheKey::new(key).map_err(CacheError::from)?;

    let value = state.cache_service.get_key(&key).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        GetCacheKeyResponseData {
            key: key.as_str().to_string(),
            value,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetCacheKeyResponseData {
    pub key: String,
    pub value: String,
}
