//! API error types and their HTTP mapping.
//!
//! Client-caused failures (validation, inverted ranges, throttling) are
//! reported before any store access. Infrastructure failures only come from
//! store calls; the client sees a generic message and the detail is logged.

use crate::domain::coerce::InvalidInput;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use tracing::{debug, error};

/// Message returned to clients for any infrastructure failure
pub const GENERIC_FAILURE_MESSAGE: &str = "Service temporarily unavailable";

/// Error category, one per HTTP outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing required field
    Validation,
    /// Logically inverted bounds (start after end)
    InvalidRange,
    /// Admission denied by the rate limiter
    RateLimited,
    /// Path exists but not for this HTTP method
    MethodNotAllowed,
    /// Request body over the configured limit
    PayloadTooLarge,
    /// Counter Store or Ledger Store failure
    Infrastructure,
    /// Anything else that is our fault
    Internal,
}

impl ErrorKind {
    /// HTTP status for this category
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation | ErrorKind::InvalidRange => StatusCode::BAD_REQUEST,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Infrastructure => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the client caused this error
    pub fn is_client_error(self) -> bool {
        self.status().is_client_error()
    }
}

/// API error rendered as `{ "message": ... }`
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Error category
    pub kind: ErrorKind,
    /// Client-visible message
    pub message: String,
    /// Offending request field, if any
    pub field: Option<String>,
    /// Log-only detail (never sent to the client)
    pub detail: Option<String>,
    /// Seconds until a throttled client may retry
    pub retry_after: Option<u64>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            detail: None,
            retry_after: None,
        }
    }

    /// Field failed coercion
    pub fn invalid_input(field: impl Into<String>, expectation: impl Into<String>) -> Self {
        let field = field.into();
        let mut err = Self::new(
            ErrorKind::Validation,
            format!("Invalid {}: {}", field, expectation.into()),
        );
        err.field = Some(field);
        err
    }

    /// No recognized field combination
    pub fn invalid_request() -> Self {
        Self::new(ErrorKind::Validation, "Invalid request")
    }

    /// Request body is not a JSON object
    pub fn parse_error() -> Self {
        Self::new(ErrorKind::Validation, "Unable to parse JSON.")
    }

    /// Range bounds are inverted
    pub fn invalid_range(field: impl Into<String>, details: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::InvalidRange, details);
        err.field = Some(field.into());
        err
    }

    /// Admission denied
    pub fn rate_limited(retry_after: Option<u64>) -> Self {
        let mut err = Self::new(ErrorKind::RateLimited, "Rate limit exceeded");
        err.retry_after = retry_after;
        err
    }

    /// Route does not accept the request method
    pub fn method_not_allowed() -> Self {
        Self::new(ErrorKind::MethodNotAllowed, "Invalid HTTP method.")
    }

    /// Body over the configured limit
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            ErrorKind::PayloadTooLarge,
            format!("Request body exceeds {} bytes", limit),
        )
    }

    /// Store failure; the detail is only logged
    pub fn infrastructure(details: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::Infrastructure, GENERIC_FAILURE_MESSAGE);
        err.detail = Some(details.into());
        err
    }

    /// Internal error; the detail is only logged
    pub fn internal(details: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::Internal, "Internal server error");
        err.detail = Some(details.into());
        err
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.message, detail),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ApiError", 1)?;
        state.serialize_field("message", &self.message)?;
        state.end()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.kind.is_client_error() {
            debug!(
                status = status.as_u16(),
                field = self.field.as_deref(),
                message = %self.message,
                "Request rejected"
            );
        } else {
            error!(
                status = status.as_u16(),
                detail = self.detail.as_deref().unwrap_or_default(),
                "Request failed"
            );
        }

        let retry_after = self.retry_after;
        let mut response = (status, Json(self)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<InvalidInput> for ApiError {
    fn from(e: InvalidInput) -> Self {
        ApiError::invalid_input(e.field, e.reason)
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Service-level errors (start-up and serving, not per request)
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Backing store could not be reached at start-up
    #[error("store connection error: {0}")]
    Store(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
