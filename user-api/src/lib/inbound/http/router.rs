use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use axum::body::Body;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::AllowHeaders;
use tower_http::cors::AllowMethods;
use tower_http::cors::AllowOrigin;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::change_password::change_password;
use super::handlers::get_cache_key::get_cache_key;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::profile::get_profile;
use super::handlers::profile::update_profile;
use super::handlers::register::register;
use super::handlers::set_cache_key::set_cache_key;
use super::handlers::ApiError;
use super::middleware::authenticate as auth_middleware;
use crate::config::CorsConfig;
use crate::domain::cache::ports::CacheServicePort;
use crate::domain::user::ports::AuthServicePort;

pub const API_BASE_PATH: &str = "/api/v1";

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServicePort>,
    pub cache_service: Arc<dyn CacheServicePort>,
    pub authenticator: Arc<Authenticator>,
}

pub fn create_router(state: AppState, cors: &CorsConfig) -> Router {
    let public_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/set-redis-key", post(set_cache_key))
        .route("/get-redis-key/:key", get(get_cache_key));

    let protected_routes = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Headers are left out of the span: they carry bearer tokens.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    let router = Router::new()
        .route("/health", get(health))
        .nest(
            API_BASE_PATH,
            Router::new().merge(public_routes).merge(protected_routes),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(trace_layer);

    // Without a CORS layer browsers apply the same-origin policy.
    let router = match cors_layer(cors) {
        Some(layer) => router.layer(layer),
        None => router,
    };

    router.with_state(state)
}

/// Turns a handler panic into the regular 500 body.
fn handle_panic(panic: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::InternalServerError(format!("handler panicked: {detail}")).into_response()
}

/// CORS policy from configuration, or `None` when CORS is disabled.
///
/// `*` in a list allows anything, an empty list falls back to anything as well.
fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let origins = if allows_any(&config.allowed_origins) {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(parse_all::<HeaderValue>(&config.allowed_origins, "origin"))
    };

    let methods = if allows_any(&config.allowed_methods) {
        AllowMethods::from(Any)
    } else {
        AllowMethods::list(parse_all::<Method>(&config.allowed_methods, "method"))
    };

    let headers = if allows_any(&config.allowed_headers) {
        AllowHeaders::from(Any)
    } else {
        AllowHeaders::list(parse_all::<HeaderName>(&config.allowed_headers, "header"))
    };

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers),
    )
}

fn allows_any(entries: &[String]) -> bool {
    entries.is_empty() || entries.iter().any(|entry| entry.trim() == "*")
}

fn parse_all<T: std::str::FromStr>(entries: &[String], kind: &str) -> Vec<T> {
    entries
        .iter()
        .filter_map(|entry| match entry.trim().parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(kind, entry = %entry, "Ignoring invalid CORS entry");
                None
            }
        })
        .collect()
}
