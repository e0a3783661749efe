use std::time::Duration;

use async_trait::async_trait;

use crate::domain::cache::errors::CacheError;
use crate::domain::cache::models::CacheKey;

/// Outbound key/value store.
///
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait Cache: Send + Sync + 'static {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Arguments
    /// * `ttl` - Time to live; `None` keeps the entry until overwritten
    ///
    /// # Errors
    /// * `Unavailable` - Backend rejected the command or is unreachable
    /// * `Timeout` - Backend did not answer in time
    async fn set(&self, key: &CacheKey, value: &str, ttl: Option<Duration>)
        -> Result<(), CacheError>;

    /// Read the value stored under `key`.
    ///
    /// # Returns
    /// Optional value (None if absent or expired)
    ///
    /// # Errors
    /// * `Unavailable` - Backend rejected the command or is unreachable
    /// * `Timeout` - Backend did not answer in time
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;
}

/// Port for the key/value endpoints.
#[async_trait]
pub trait CacheServicePort: Send + Sync + 'static {
    /// Store `value` under `key` without expiry.
    ///
    /// # Errors
    /// * `EmptyValue` - Value is empty
    /// * `Unavailable` / `Timeout` - Backend failure
    async fn set_key(&self, key: &CacheKey, value: &str) -> Result<(), CacheError>;

    /// # Errors
    /// * `NotFound` - No value stored under `key`
    /// * `Unavailable` / `Timeout` - Backend failure
    async fn get_key(&self, key: &CacheKey) -> Result<String, CacheError>;
}
