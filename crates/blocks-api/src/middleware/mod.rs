//! Middleware stack for the blocks API.
//!
//! Layer order: Request → Tracing → ClientIp → CORS → RateLimit → Validation → Handler
//!
//! Admission runs before the body is read, so throttled clients cost one
//! Counter Store round trip and nothing else.

pub mod client_ip;
pub mod cors;
pub mod rate_limit;
pub mod tracing;
pub mod validation;

pub use cors::create_cors_layer;
pub use client_ip::{ClientIp, ClientIpLayer};
pub use rate_limit::{AdmissionDecision, AdmissionGate, RateLimitLayer};
pub use self::tracing::TracingLayer;
pub use validation::{parse_body, ValidationLayer};

use crate::domain::config::ApiConfig;
use crate::ports::{CounterStore, TimeSource};
use std::sync::Arc;

/// Middleware stack builder
#[derive(Clone)]
pub struct MiddlewareStack {
    pub tracing: TracingLayer,
    pub client_ip: ClientIpLayer,
    pub cors: tower_http::cors::CorsLayer,
    pub rate_limit: RateLimitLayer,
    pub validation: ValidationLayer,
}

impl MiddlewareStack {
    /// Create middleware stack from service config
    pub fn from_config(
        config: &ApiConfig,
        counters: Arc<dyn CounterStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let gate = Arc::new(AdmissionGate::new(&config.rate_limit, counters, clock));
        Self {
            tracing: TracingLayer::new(),
            client_ip: ClientIpLayer::new(&config.security),
            cors: create_cors_layer(&config.cors),
            rate_limit: RateLimitLayer::new(gate),
            validation: ValidationLayer::new(config.http.max_body_size),
        }
    }
}
