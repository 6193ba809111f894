//! Client IP resolution.
//!
//! The direct peer is the client unless it is a trusted proxy, in which case
//! `X-Forwarded-For` names the client. The result is stored as a
//! [`ClientIp`] request extension for the admission layer.

use crate::domain::config::SecurityConfig;
use axum::{body::Body, extract::ConnectInfo, http::Request, response::Response};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn, Span};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolved client address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Resolves [`ClientIp`] for every request
#[derive(Clone)]
pub struct ClientIpLayer {
    security: Arc<SecurityConfig>,
}

impl ClientIpLayer {
    pub fn new(security: &SecurityConfig) -> Self {
        Self {
            security: Arc::new(security.clone()),
        }
    }
}

impl<S> Layer<S> for ClientIpLayer {
    type Service = ClientIpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientIpService {
            inner,
            security: Arc::clone(&self.security),
        }
    }
}

#[derive(Clone)]
pub struct ClientIpService<S> {
    inner: S,
    security: Arc<SecurityConfig>,
}

impl<S> Service<Request<Body>> for ClientIpService<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |ConnectInfo(addr)| addr.ip());

        let client = resolve_client_ip(&req, peer, &self.security);
        Span::current().record("client_ip", tracing::field::display(client));
        req.extensions_mut().insert(ClientIp(client));

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}

/// Client address for a request arriving from `peer`
pub fn resolve_client_ip<B>(req: &Request<B>, peer: IpAddr, security: &SecurityConfig) -> IpAddr {
    let forwarded = req
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|h| h.to_str().ok());
    let Some(forwarded) = forwarded else {
        return peer;
    };

    if !trusts(security, peer) {
        warn!(peer = %peer, forwarded, "Ignoring X-Forwarded-For from untrusted peer");
        return peer;
    }

    // Each trusted hop appends its peer; the client sits proxy_count from the right
    let hops: Vec<&str> = forwarded.split(',').map(str::trim).collect();
    let position = hops.len().saturating_sub(security.proxy_count + 1);
    match hops.get(position).and_then(|hop| hop.parse::<IpAddr>().ok()) {
        Some(client) => {
            debug!(forwarded, client = %client, "Client named by proxy");
            client
        }
        None => peer,
    }
}

fn trusts(security: &SecurityConfig, peer: IpAddr) -> bool {
    security.trusted_proxies.contains(&peer)
        || (security.trust_localhost && peer.is_loopback())
        || (security.trust_private_ips && is_private(peer))
}

fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
        // fc00::/7
        IpAddr::V6(v6) => (v6.octets()[0] & 0xfe) == 0xfc,
    }
}
