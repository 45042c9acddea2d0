use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Query, RawPathParams, Request, State},
    http::{header::CONTENT_LENGTH, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{json, Map, Value};
use std::{collections::HashMap, sync::Arc};

use crate::error::ErrorKind;
use crate::response::ApiResponse;
use crate::validation::RequestSchema;

/// An Axum middleware validating body, query and path parameters against a schema.
///
/// On success the normalized [`Validated`](crate::validation::Validated) value is
/// inserted into the request extensions and the original body is passed on intact.
/// On failure the request never reaches the handler and a `400 validation_error`
/// envelope lists every collected message under `details.errors`.
pub async fn validate_request(State(schema): State<Arc<RequestSchema>>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let params = path_params(&mut parts).await;
    let query = match query_params(&parts) {
        Ok(q) => q,
        Err(message) => return reject(vec![message]),
    };

    let (body, parsed) = if schema.body.is_some() {
        if declared_length(&parts).is_some_and(|len| len > schema.max_body_bytes) {
            return too_large(schema.max_body_bytes);
        }
        let bytes = match to_bytes(body, schema.max_body_bytes).await {
            Ok(b) => b,
            Err(_) => return too_large(schema.max_body_bytes),
        };
        let parsed = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Map::new())
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!("Rejected unparseable JSON body: {}", e);
                    return reject(vec!["body must be valid JSON".to_string()]);
                }
            }
        };
        (Body::from(bytes), Some(parsed))
    } else {
        (body, None)
    };

    match schema.validate(parsed.as_ref(), &query, &params) {
        Ok(validated) => {
            let mut req = Request::from_parts(parts, body);
            req.extensions_mut().insert(validated);
            next.run(req).await
        }
        Err(errors) => {
            tracing::debug!(path = %parts.uri.path(), errors = ?errors, "Request validation failed");
            reject(errors)
        }
    }
}

async fn path_params(parts: &mut Parts) -> Value {
    let mut map = Map::new();
    // Routes without captures have no params to validate
    if let Ok(raw) = RawPathParams::from_request_parts(parts, &()).await {
        for (key, value) in &raw {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    Value::Object(map)
}

fn query_params(parts: &Parts) -> Result<Value, String> {
    let Query(raw) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map_err(|e| format!("query string is malformed: {}", e.body_text()))?;
    Ok(Value::Object(raw.into_iter().map(|(k, v)| (k, Value::String(v))).collect()))
}

fn declared_length(parts: &Parts) -> Option<usize> {
    parts.headers.get(CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

fn reject(errors: Vec<String>) -> Response {
    ApiResponse::validation_error(errors.join(", "), Some(json!({ "errors": errors }))).into_response()
}

fn too_large(limit: usize) -> Response {
    ApiResponse::error(
        ErrorKind::ValidationError,
        format!("Request body exceeds the limit of {} bytes", limit),
        StatusCode::PAYLOAD_TOO_LARGE,
        Some(json!({ "limit": limit })),
    )
    .into_response()
}
