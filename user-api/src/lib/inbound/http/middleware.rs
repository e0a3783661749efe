use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::extractors::AuthenticatedSubject;
use super::handlers::ApiError;
use super::handlers::UNAUTHENTICATED;
use crate::inbound::http::router::AppState;

/// Middleware that verifies the bearer token and stores its subject in request extensions.
///
/// Every failure yields the same 401 response; the cause is only logged.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token_from_header(&req)?;

    let subject = state.authenticator.validate_token(token).map_err(|e| {
        tracing::warn!(error = %e, "JWT validation failed");
        ApiError::Unauthorized(UNAUTHENTICATED.to_string())
    })?;

    req.extensions_mut().insert(AuthenticatedSubject(subject));

    Ok(next.run(req).await)
}

fn extract_token_from_header(req: &Request) -> Result<&str, ApiError> {
    let unauthenticated = |reason: &str| {
        tracing::warn!(reason, "Rejected Authorization header");
        ApiError::Unauthorized(UNAUTHENTICATED.to_string())
    };

    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthenticated("missing"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| unauthenticated("not ascii"))?;

    bearer_token(auth_str).ok_or_else(|| unauthenticated("expected: Bearer <token>"))
}

/// Token of a `Bearer` credential; the scheme name is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim_start().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("BEARER  abc.def.ghi "), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_rejects_other_shapes() {
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer    "), None);
        assert_eq!(bearer_token("Bearerabc"), None);
        assert_eq!(bearer_token(""), None);
    }
}
