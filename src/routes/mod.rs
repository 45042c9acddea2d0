//! HTTP route handlers and the router that wires them to the middleware stack.
//!
//! - `health`: probes, application info and the health envelope
//! - `hello_world`: hello-world messages
//! - `users`: user CRUD

pub mod health;
pub mod hello_world;
pub mod users;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    http::{Method, Uri},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{error_handler, rate_limit::rate_limit_middleware, security_headers, validation};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{schemas, RequestSchema};

async fn not_found(uri: Uri) -> ApiResponse {
    ApiResponse::not_found(format!("Route {} not found", uri.path()), None)
}

async fn method_not_allowed(method: Method, uri: Uri) -> ApiResponse {
    ApiResponse::method_not_allowed(format!("Method {} not allowed for {}", method, uri.path()), None)
}

/// Builds the complete application: routes, per-route middleware and the global stack.
///
/// Outermost first: CORS, security headers, compression, request tracing, the terminal
/// error stage, the panic catcher, then the global rate limiter in front of every API
/// route. The `/healthz` and `/readyz` probes bypass the global limiter.
pub fn app(state: AppState) -> Router {
    let cfg = state.config.clone();
    let max_body = cfg.server.max_body_bytes;
    let validate =
        |schema: RequestSchema| from_fn_with_state(Arc::new(schema.max_body_bytes(max_body)), validation::validate_request);
    let user_create_limit = from_fn_with_state(state.user_create_limiter.clone(), rate_limit_middleware);

    let api = Router::new()
        .route("/", get(health::app_info))
        .route("/api/health", get(health::health))
        .route(
            "/api/hello-world",
            get(hello_world::get_hello.layer(validate(schemas::get_hello())))
                .post(hello_world::create_hello.layer(validate(schemas::create_hello()))),
        )
        .route("/api/hello-world/list", get(hello_world::list_hello))
        .route(
            "/api/users",
            get(users::list_users.layer(validate(schemas::list_users())))
                .post(users::create_user.layer(validate(schemas::create_user())).layer(user_create_limit)),
        )
        .route(
            "/api/users/{id}",
            get(users::get_user.layer(validate(schemas::id_params())))
                .put(users::update_user.layer(validate(schemas::update_user())))
                .delete(users::delete_user.layer(validate(schemas::id_params()))),
        )
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(from_fn_with_state(state.global_limiter.clone(), rate_limit_middleware));

    let probes = Router::new().route("/healthz", get(health::healthz)).route("/readyz", get(health::readyz));

    let app = probes
        .merge(api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CatchPanicLayer::custom(error_handler::handle_panic))
        .layer(from_fn_with_state(cfg.clone(), error_handler::error_envelope_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(from_fn_with_state(cfg.clone(), security_headers::security_headers_middleware));

    if cfg.security.cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
