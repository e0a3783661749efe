use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Claims carried by a bearer token.
///
/// Timestamps are Unix seconds. `exp` is always `iat + validity`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (the authenticated user identifier)
    pub sub: String,

    /// Issued at
    pub iat: i64,

    /// Expiration time
    pub exp: i64,
}

impl Claims {
    /// Build claims for `subject` issued at `now` and valid for `validity`.
    pub fn new(subject: impl Into<String>, now: DateTime<Utc>, validity: Duration) -> Self {
        let issued_at = now.timestamp();

        Self {
            sub: subject.into(),
            iat: issued_at,
            exp: issued_at + validity.num_seconds(),
        }
    }

    /// A token is expired from the instant `now >= exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_claims() {
        let now = Utc::now();
        let claims = Claims::new("42", now, Duration::hours(24));

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_is_expired_at_boundary() {
        let now = Utc::now();
        let claims = Claims::new("42", now, Duration::seconds(60));

        assert!(!claims.is_expired_at(now + Duration::seconds(59)));
        assert!(claims.is_expired_at(now + Duration::seconds(60)));
        assert!(claims.is_expired_at(now + Duration::seconds(61)));
    }

    #[test]
    fn test_wire_format() {
        let claims = Claims {
            sub: "7".to_string(),
            iat: 100,
            exp: 160,
        };

        let json = serde_json::to_value(&claims).expect("Failed to serialize claims");
        assert_eq!(json, serde_json::json!({ "sub": "7", "iat": 100, "exp": 160 }));
    }

    #[test]
    fn test_expires_at() {
        let claims = Claims {
            sub: "7".to_string(),
            iat: 0,
            exp: 3600,
        };

        let expires_at = claims.expires_at().expect("timestamp in range");
        assert_eq!(expires_at.timestamp(), 3600);
    }
}
