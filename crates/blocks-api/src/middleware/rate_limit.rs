//! Admission control: a per-client, per-UTC-day request counter.
//!
//! Each request reads the client's counter and remaining TTL, then writes
//! back `count + 1` with that same remaining TTL (the full window for a new
//! counter). The TTL is never extended, so a counter dies one window after
//! its first request. Rejected requests are counted too.
//!
//! The read and the write are separate Counter Store calls. Two concurrent
//! requests from one client can read the same count and both be admitted;
//! this slack is accepted.

use crate::domain::config::RateLimitConfig;
use crate::domain::error::ApiError;
use crate::middleware::client_ip::ClientIp;
use crate::ports::{CounterStore, CounterStoreError, TimeSource};
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub admitted: bool,
    /// Counter value after this request (0 when the gate was bypassed)
    pub count: u64,
    /// TTL written back with the counter
    pub ttl: Option<Duration>,
}

impl AdmissionDecision {
    fn bypassed() -> Self {
        Self {
            admitted: true,
            count: 0,
            ttl: None,
        }
    }

    /// Whole seconds until the counter expires, rounded up
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.ttl
            .map(|ttl| ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0))
    }
}

/// Decides whether a client may proceed
pub struct AdmissionGate {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn TimeSource>,
    window: Duration,
    limit: u64,
    enabled: bool,
    exempt: HashSet<IpAddr>,
}

impl AdmissionGate {
    pub fn new(
        config: &RateLimitConfig,
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            store,
            clock,
            window: config.window,
            limit: config.limit,
            enabled: config.enabled,
            exempt: config.exempt.iter().copied().collect(),
        }
    }

    /// Counter key: client plus the UTC calendar date, `"{ip}_{YYYYMMDD}"`
    pub fn rate_key(client: &str, now: DateTime<Utc>) -> String {
        format!("{}_{}", client, now.format("%Y%m%d"))
    }

    fn bypasses(&self, client: &str) -> bool {
        !self.enabled
            || client
                .parse::<IpAddr>()
                .is_ok_and(|ip| self.exempt.contains(&ip))
    }

    /// Count this request and decide
    pub async fn check(&self, client: &str) -> Result<AdmissionDecision, CounterStoreError> {
        if self.bypasses(client) {
            return Ok(AdmissionDecision::bypassed());
        }

        let key = Self::rate_key(client, self.clock.now());
        let entry = self.store.get(&key).await?;

        let (count, ttl) = match entry.count {
            None => (1, self.window),
            Some(previous) => (
                previous.saturating_add(1),
                entry
                    .ttl_remaining
                    .filter(|ttl| !ttl.is_zero())
                    .unwrap_or(self.window),
            ),
        };

        self.store.set_with_expiry(&key, count, ttl).await?;

        Ok(AdmissionDecision {
            admitted: count <= self.limit,
            count,
            ttl: Some(ttl),
        })
    }

    /// Whether `client` may proceed
    pub async fn admit(&self, client: &str) -> Result<bool, CounterStoreError> {
        Ok(self.check(client).await?.admitted)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Rate limit layer
#[derive(Clone)]
pub struct RateLimitLayer {
    gate: Arc<AdmissionGate>,
}

impl RateLimitLayer {
    pub fn new(gate: Arc<AdmissionGate>) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            gate: Arc::clone(&self.gate),
        }
    }
}

/// Rate limit service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    gate: Arc<AdmissionGate>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
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
        let gate = Arc::clone(&self.gate);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ip = extract_client_ip(&req);

            match gate.check(&ip.to_string()).await {
                Ok(decision) if decision.admitted => {
                    debug!(ip = %ip, count = decision.count, "Request admitted");
                    inner.call(req).await
                }
                Ok(decision) => {
                    warn!(
                        ip = %ip,
                        count = decision.count,
                        limit = gate.limit(),
                        "Rate limit exceeded"
                    );
                    Ok(ApiError::rate_limited(decision.retry_after_secs()).into_response())
                }
                Err(e) => Ok(ApiError::from(e).into_response()),
            }
        })
    }
}

/// Client IP resolved upstream, else the direct peer
fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    if let Some(ClientIp(ip)) = req.extensions().get::<ClientIp>() {
        return *ip;
    }
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
