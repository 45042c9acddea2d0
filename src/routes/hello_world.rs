use axum::{extract::State, http::StatusCode, Extension};
use serde::Deserialize;

use crate::{
    error::AppResult,
    repository::non_empty,
    response::ApiResponse,
    state::AppState,
    validation::Validated,
};

const DEFAULT_NAME: &str = "World";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HelloQuery {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HelloBody {
    name: String,
    #[serde(default)]
    message: Option<String>,
}

/// The latest message for `?name=` (default `World`), created on first request.
pub async fn get_hello(State(state): State<AppState>, Extension(v): Extension<Validated>) -> AppResult<ApiResponse> {
    let q: HelloQuery = v.query_as()?;
    let name = non_empty(q.name).unwrap_or_else(|| DEFAULT_NAME.to_string());

    let message = match state.messages.latest_by_name(&name).await? {
        Some(m) => m,
        None => {
            tracing::debug!(name = %name, "Creating new Hello World message");
            state.messages.create(&name, None).await?
        }
    };
    Ok(ApiResponse::success_with("Hello World message retrieved", &message)?)
}

pub async fn create_hello(
    State(state): State<AppState>,
    Extension(v): Extension<Validated>,
) -> AppResult<(StatusCode, ApiResponse)> {
    let body: HelloBody = v.body_as()?;
    let message = non_empty(body.message);
    let created = state.messages.create(&body.name, message.as_deref()).await?;
    Ok((StatusCode::CREATED, ApiResponse::success_with("Hello World message added", &created)?))
}

pub async fn list_hello(State(state): State<AppState>) -> AppResult<ApiResponse> {
    let messages = state.messages.list().await?;
    Ok(ApiResponse::success_with("Hello World messages retrieved", &messages)?)
}
