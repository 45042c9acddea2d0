use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt;

use crate::response::ApiResponse;

/// Response header carrying the id an internal error was logged under.
pub const ERROR_ID_HEADER: &str = "x-error-id";

/// The closed set of error kinds a client can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    DatabaseError,
    AuthenticationError,
    AuthorizationError,
    NotFound,
    InternalError,
    RateLimitExceeded,
    MethodNotAllowed,
    ServiceUnavailable,
    GatewayTimeout,
}

impl ErrorKind {
    /// The conventional HTTP status for this kind.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::AuthenticationError => StatusCode::UNAUTHORIZED,
            ErrorKind::AuthorizationError => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Best-effort kind for an error status that was not produced by an `AppError`.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ErrorKind::AuthenticationError,
            StatusCode::FORBIDDEN => ErrorKind::AuthorizationError,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::METHOD_NOT_ALLOWED => ErrorKind::MethodNotAllowed,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimitExceeded,
            StatusCode::SERVICE_UNAVAILABLE => ErrorKind::ServiceUnavailable,
            StatusCode::GATEWAY_TIMEOUT => ErrorKind::GatewayTimeout,
            s if s.is_client_error() => ErrorKind::ValidationError,
            _ => ErrorKind::InternalError,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::DatabaseError => "database_error",
            ErrorKind::AuthenticationError => "authentication_error",
            ErrorKind::AuthorizationError => "authorization_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InternalError => "internal_error",
            ErrorKind::RateLimitExceeded => "rate_limit_exceeded",
            ErrorKind::MethodNotAllowed => "method_not_allowed",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::GatewayTimeout => "gateway_timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type returned by handlers and services.
///
/// Carries the kind, the client-facing message and the HTTP status; it is turned into
/// an error envelope exactly once, when the handler's result becomes a response.
#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: StatusCode,
    pub details: Option<Value>,
    source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), status: kind.status_code(), details: None, source: None }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthenticationError, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthorizationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GatewayTimeout, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            Some(e) => Some(e.as_ref()),
            None => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut error_id = None;
        match self.kind {
            ErrorKind::InternalError => {
                let id = uuid::Uuid::new_v4();
                match &self.source {
                    Some(source) => tracing::error!(error_id = %id, "Internal error: {} ({:?})", self.message, source),
                    None => tracing::error!(error_id = %id, "Internal error: {}", self.message),
                }
                error_id = Some(id);
            }
            ErrorKind::DatabaseError => match &self.source {
                Some(source) => tracing::error!("Database error: {} ({})", self.message, source),
                None => tracing::error!("Database error: {}", self.message),
            },
            kind => tracing::debug!(kind = %kind, status = self.status.as_u16(), "{}", self.message),
        }

        let mut response = ApiResponse::error(self.kind, self.message, self.status, self.details).into_response();
        if let Some(id) = error_id {
            if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                response.headers_mut().insert(HeaderName::from_static(ERROR_ID_HEADER), value);
            }
        }
        response
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let mut e = AppError::internal(err.to_string());
        e.source = Some(err);
        e
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::validation("A record with the same unique value already exists")
                    .with_details(json!({ "constraint": db_err.message() }))
            }
            sqlx::Error::PoolTimedOut => AppError::service_unavailable("Database connection pool timed out"),
            other => {
                let mut e = AppError::database("A database error occurred");
                e.source = Some(anyhow::Error::new(other));
                e
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        let mut e = AppError::internal(format!("Serialization error: {}", err));
        e.source = Some(anyhow::Error::new(err));
        e
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal(format!("I/O error: {}: {}", err.kind(), err))
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// An extension trait for `Option` that converts a missing value into a `not_found` error.
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::not_found(format!("{} not found", entity)))
    }
}
