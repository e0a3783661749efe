use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::cache::errors::CacheError;
use crate::domain::cache::models::CacheKey;
use crate::domain::cache::ports::Cache;
use crate::domain::cache::ports::CacheServicePort;

/// Pass-through access to the shared cache.
pub struct CacheService<C>
where
    C: Cache,
{
    cache: Arc<C>,
}

impl<C> CacheService<C>
where
    C: Cache,
{
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl<C> CacheServicePort for CacheService<C>
where
    C: Cache,
{
    async fn set_key(&self, key: &CacheKey, value: &str) -> Result<(), CacheError> {
        if value.is_empty() {
            return Err(CacheError::EmptyValue);
        }

        self.cache.set(key, value, None).await?;
        tracing::debug!(key = %key, "Cache key set");

        Ok(())
    }

    async fn get_key(&self, key: &CacheKey) -> Result<String, CacheError> {
        self.cache
            .get(key)
            .await?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }
}
