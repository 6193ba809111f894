//! Request body validation and the request parameter extractor.
//!
//! The layer enforces the body size limit and rejects bodies that are not a
//! JSON object. Handlers then take [`RequestParams`], the query string
//! merged with the body.

use crate::domain::error::{ApiError, ErrorKind};
use crate::domain::params::RequestParams;
use axum::{
    async_trait,
    body::{Body, HttpBody},
    extract::{FromRequest, Query, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{Map, Value};
use tower::{Layer, Service};
use tracing::warn;

/// Parse a request body into a JSON object; an empty body is no body.
pub fn parse_body(body: &[u8]) -> Result<Option<Map<String, Value>>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(Some(fields)),
        _ => Err(ApiError::parse_error()),
    }
}

/// Body validation layer
#[derive(Clone)]
pub struct ValidationLayer {
    max_body_size: usize,
}

impl ValidationLayer {
    pub fn new(max_body_size: usize) -> Self {
        Self { max_body_size }
    }
}

impl<S> Layer<S> for ValidationLayer {
    type Service = ValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidationService {
            inner,
            max_body_size: self.max_body_size,
        }
    }
}

/// Validation service
#[derive(Clone)]
pub struct ValidationService<S> {
    inner: S,
    max_body_size: usize,
}

impl<S> Service<Request<Body>> for ValidationService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let max = self.max_body_size;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // Content-Length fast path
            let declared = req
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());
            if let Some(len) = declared.filter(|len| *len > max) {
                warn!(size = len, max, "Request too large (from header)");
                return Ok(ApiError::payload_too_large(max).into_response());
            }

            // Any method may carry a body, with or without Content-Length
            if req.body().size_hint().exact() == Some(0) {
                return inner.call(req).await;
            }

            let (parts, body) = req.into_parts();
            let bytes = match axum::body::to_bytes(body, max).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, max, "Failed to read request body");
                    return Ok(ApiError::payload_too_large(max).into_response());
                }
            };

            if let Err(e) = parse_body(&bytes) {
                return Ok(e.into_response());
            }

            inner.call(Request::from_parts(parts, Body::from(bytes))).await
        })
    }
}

#[async_trait]
impl<S> FromRequest<S> for RequestParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(req.uri())
            .map_err(|_| ApiError::invalid_request())?;

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::new(ErrorKind::PayloadTooLarge, rejection.body_text())
            } else {
                ApiError::parse_error()
            }
        })?;

        Ok(RequestParams::from_parts(query, parse_body(&bytes)?))
    }
}
