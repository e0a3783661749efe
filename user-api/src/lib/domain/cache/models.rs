use std::fmt;

use crate::domain::cache::errors::CacheKeyError;

/// Key of an entry in the shared key/value cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// # Errors
    /// * `Empty` - Key is empty or whitespace only
    pub fn new(key: String) -> Result<Self, CacheKeyError> {
        if key.trim().is_empty() {
            return Err(CacheKeyError::Empty);
        }
        Ok(Self(key))
    }

    /// Key recording the id of the user registered under `email`.
    pub fn registered_user(email: &str) -> Self {
        Self(format!("user:registered:{email}"))
    }

    /// Key recording the last token issued to `user_id`.
    pub fn user_token(user_id: i64) -> Self {
        Self(format!("user:token:{user_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_rejects_empty() {
        assert_eq!(CacheKey::new(String::new()), Err(CacheKeyError::Empty));
        assert_eq!(CacheKey::new("  ".to_string()), Err(CacheKeyError::Empty));
        assert_eq!(CacheKey::new("a".to_string()).unwrap().as_str(), "a");
    }

    #[test]
    fn test_well_known_keys() {
        assert_eq!(
            CacheKey::registered_user("ada@x.com").as_str(),
            "user:registered:ada@x.com"
        );
        assert_eq!(CacheKey::user_token(1).as_str(), "user:token:1");
    }
}
