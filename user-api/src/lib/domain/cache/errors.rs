use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheKeyError {
    #[error("key is required")]
    Empty,
}

/// Error for cache operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("{0}")]
    InvalidKey(#[from] CacheKeyError),

    #[error("value is required")]
    EmptyValue,

    #[error("key not found")]
    NotFound(String),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
}
