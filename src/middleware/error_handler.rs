//! Terminal error stage.
//!
//! Every error response leaving the application is an [`ApiResponse`] envelope. Errors
//! produced outside the envelope builder (extractor rejections, the router's default
//! 405, body-limit errors) are rewritten here, and internal error messages are
//! redacted when running in production.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderName, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{any::Any, sync::Arc};

use crate::config::AppConfig;
use crate::error::{ErrorKind, ERROR_ID_HEADER};
use crate::response::{ApiResponse, Enveloped, ErrorBody};

const REDACTED_MESSAGE: &str = "Internal Server Error";
const MAX_FOREIGN_ERROR_BODY: usize = 64 * 1024;

pub async fn error_envelope_middleware(State(cfg): State<Arc<AppConfig>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }
    let production = cfg.app.environment.is_production();

    if response.extensions().get::<Enveloped>().is_some() {
        let internal = response
            .extensions()
            .get::<ErrorBody>()
            .filter(|body| body.error == ErrorKind::InternalError)
            .cloned();
        return match internal {
            Some(body) if production => redact(response, body),
            _ => response,
        };
    }

    let (parts, body) = response.into_parts();
    let text = match to_bytes(body, MAX_FOREIGN_ERROR_BODY).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(_) => String::new(),
    };
    let kind = ErrorKind::from_status(status);
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("Request failed").to_string()
    } else {
        text
    };
    tracing::debug!(status = status.as_u16(), kind = %kind, "Wrapping non-envelope error response: {}", message);

    let message = if production && kind == ErrorKind::InternalError { REDACTED_MESSAGE.to_string() } else { message };
    let mut wrapped = ApiResponse::error(kind, message, status, None).into_response();
    for (name, value) in parts.headers.iter() {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            wrapped.headers_mut().append(name.clone(), value.clone());
        }
    }
    wrapped
}

fn redact(response: Response, body: ErrorBody) -> Response {
    let status = response.status();
    let error_id = response.headers().get(ERROR_ID_HEADER).cloned();
    let mut redacted = ApiResponse::error(body.error, REDACTED_MESSAGE, status, None).into_response();
    if let Some(id) = error_id {
        redacted.headers_mut().insert(HeaderName::from_static(ERROR_ID_HEADER), id);
    }
    redacted
}

/// Turns a handler panic into an `internal_error` envelope for `CatchPanicLayer`.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    let error_id = uuid::Uuid::new_v4();
    tracing::error!(error_id = %error_id, "Handler panicked: {}", detail);

    let mut response = ApiResponse::internal_error("An unexpected error occurred", None).into_response();
    if let Ok(value) = HeaderValue::from_str(&error_id.to_string()) {
        response.headers_mut().insert(HeaderName::from_static(ERROR_ID_HEADER), value);
    }
    response
}
