//! The uniform JSON envelope wrapped around every API response.
//!
//! ```json
//! { "status": "success", "message": "...", "timestamp": "...", "data": ..., "meta": { "pagination": ... } }
//! { "status": "error", "error": "not_found", "message": "...", "timestamp": "...", "details": ... }
//! ```
//!
//! Construction never fails and has no side effects. Converting an envelope into a
//! response tags the response with [`Enveloped`] so the terminal error stage leaves it
//! alone, and error envelopes additionally carry their [`ErrorBody`] as an extension.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ErrorKind;

/// Current time as ISO-8601 with millisecond precision, e.g. `2024-05-01T10:00:00.000Z`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Marker extension set on every response built from an [`ApiResponse`].
#[derive(Debug, Clone, Copy)]
pub struct Enveloped;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self { page, limit, total, total_pages }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessBody {
    pub message: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Overrides the kind's conventional status. Never serialized.
    #[serde(skip)]
    pub status_code: Option<StatusCode>,
}

impl ErrorBody {
    pub fn status_code(&self) -> StatusCode {
        self.status_code.unwrap_or_else(|| self.error.status_code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse {
    Success(SuccessBody),
    Error(ErrorBody),
}

impl ApiResponse {
    /// A success envelope. A `null` payload is treated as absent.
    pub fn success(message: impl Into<String>, data: Option<Value>, meta: Option<Map<String, Value>>) -> Self {
        ApiResponse::Success(SuccessBody {
            message: message.into(),
            timestamp: now_iso(),
            data: data.filter(|d| !d.is_null()),
            meta,
        })
    }

    /// A success envelope carrying a typed payload.
    pub fn success_with<T: Serialize>(message: impl Into<String>, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::success(message, Some(serde_json::to_value(data)?), None))
    }

    pub fn error(
        kind: ErrorKind,
        message: impl Into<String>,
        status_code: StatusCode,
        details: Option<Value>,
    ) -> Self {
        ApiResponse::Error(ErrorBody {
            error: kind,
            message: message.into(),
            timestamp: now_iso(),
            details: details.filter(|d| !d.is_null()),
            status_code: Some(status_code),
        })
    }

    fn of_kind(kind: ErrorKind, message: impl Into<String>, details: Option<Value>) -> Self {
        Self::error(kind, message, kind.status_code(), details)
    }

    pub fn validation_error(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::of_kind(ErrorKind::ValidationError, message, details)
    }

    pub fn database_error(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::of_kind(ErrorKind::DatabaseError, message, details)
    }

    pub fn authentication_error(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::of_kind(ErrorKind::AuthenticationError, message, details)
    }

    pub fn authorization_error(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::of_kind(ErrorKind::AuthorizationError, message, details)
    }

    pub fn not_found(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::of_kind(ErrorKind::NotFound, message, details)
    }

    pub fn internal_error(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::of_kind(ErrorKind::InternalError, message, details)
    }

    pub fn rate_limit_exceeded(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::of_kind(ErrorKind::RateLimitExceeded, message, details)
    }

    pub fn method_not_allowed(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::of_kind(ErrorKind::MethodNotAllowed, message, details)
    }

    pub fn service_unavailable(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::of_kind(ErrorKind::ServiceUnavailable, message, details)
    }

    pub fn gateway_timeout(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::of_kind(ErrorKind::GatewayTimeout, message, details)
    }

    /// Attaches `key: value` under `meta`. No effect on error envelopes.
    pub fn add_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        if let ApiResponse::Success(body) = &mut self {
            body.meta.get_or_insert_with(Map::new).insert(key.into(), value);
        }
        self
    }

    /// Attaches `meta.pagination` with `totalPages = ceil(total / limit)`.
    pub fn with_pagination(self, page: u64, limit: u64, total: u64) -> Self {
        let pagination = Pagination::new(page, limit, total);
        match serde_json::to_value(pagination) {
            Ok(value) => self.add_meta("pagination", value),
            Err(_) => self,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ApiResponse::Success(body) => &body.message,
            ApiResponse::Error(body) => &body.message,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiResponse::Success(_) => StatusCode::OK,
            ApiResponse::Error(body) => body.status_code(),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_body = match &self {
            ApiResponse::Error(body) => Some(body.clone()),
            ApiResponse::Success(_) => None,
        };
        let mut response = (status, Json(self)).into_response();
        response.extensions_mut().insert(Enveloped);
        if let Some(body) = error_body {
            response.extensions_mut().insert(body);
        }
        response
    }
}
