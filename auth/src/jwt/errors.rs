use thiserror::Error;

/// Error type for JWT operations.
///
/// Variants stay distinct for logging; callers facing clients should
/// collapse them into a single "unauthenticated" outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is expired")]
    Expired,

    #[error("Token has no subject")]
    MissingSubject,
}
