use crate::{db, error::AppResult, response::ApiResponse, state::AppState};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use std::time::Duration;

const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

// Liveness probe - lightweight, no database access
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: checks DB connectivity with timeout protection
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::time::timeout(READINESS_TIMEOUT, db::ping(&state.db)).await {
        Ok(Ok(())) => ApiResponse::success("ready", None, None).into_response(),
        Ok(Err(e)) => {
            tracing::warn!("Readiness check failed: {}", e);
            ApiResponse::service_unavailable("Database is not reachable", None).into_response()
        }
        Err(_) => ApiResponse::gateway_timeout("Database readiness check timed out", None).into_response(),
    }
}

/// Application info served at `/`.
pub async fn app_info(State(state): State<AppState>) -> AppResult<ApiResponse> {
    let info = json!({
        "name": state.config.app.name,
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "environment": state.config.app.environment.as_str(),
        "endpoints": {
            "health": "/api/health",
            "helloWorld": "/api/hello-world",
            "users": "/api/users",
        },
    });
    Ok(ApiResponse::success("Application info retrieved", Some(info), None))
}

pub async fn health(State(state): State<AppState>) -> AppResult<ApiResponse> {
    let connected = matches!(tokio::time::timeout(READINESS_TIMEOUT, db::ping(&state.db)).await, Ok(Ok(())));
    let stats = state.rate_limits.stats().await;
    let info = json!({
        "status": "OK",
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "environment": state.config.app.environment.as_str(),
        "version": env!("CARGO_PKG_VERSION"),
        "database": { "connected": connected },
        "rateLimit": serde_json::to_value(stats)?,
    });
    Ok(ApiResponse::success("Health check successful", Some(info), None))
}
