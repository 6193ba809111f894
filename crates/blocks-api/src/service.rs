//! Blocks API service: HTTP routes, middleware stack and serving loop.

use crate::domain::config::ApiConfig;
use crate::domain::error::{ApiError, ApiResult, ServiceError};
use crate::domain::params::RequestParams;
use crate::domain::types::{QueryOutcome, ResultEnvelope, ResultsBody};
use crate::middleware::MiddlewareStack;
use crate::ports::{CounterStore, LedgerStore, SystemTimeSource, TimeSource};
use crate::router::{GasPriceResult, HealthStatus, QueryRouter};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    router: QueryRouter,
}

/// Blocks API service
pub struct ApiService {
    config: ApiConfig,
    router: QueryRouter,
    middleware: MiddlewareStack,
}

impl ApiService {
    /// Create a new service over the given stores
    pub fn new(
        config: ApiConfig,
        ledger: Arc<dyn LedgerStore>,
        counters: Arc<dyn CounterStore>,
    ) -> Result<Self, ServiceError> {
        Self::with_clock(config, ledger, counters, Arc::new(SystemTimeSource))
    }

    /// Create a service whose admission day buckets follow `clock`
    pub fn with_clock(
        config: ApiConfig,
        ledger: Arc<dyn LedgerStore>,
        counters: Arc<dyn CounterStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ServiceError> {
        config
            .validate()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        let router = QueryRouter::new(ledger, &config.pagination, &config.gas_price);
        let middleware = MiddlewareStack::from_config(&config, counters, clock);

        Ok(Self {
            config,
            router,
            middleware,
        })
    }

    /// Build the HTTP router with the full middleware stack
    pub fn build_router(&self) -> Router {
        let state = AppState {
            router: self.router.clone(),
        };

        let middleware = ServiceBuilder::new()
            .layer(self.middleware.tracing.clone())
            .layer(self.middleware.client_ip.clone())
            .layer(self.middleware.cors.clone())
            .layer(self.middleware.rate_limit.clone())
            .layer(self.middleware.validation.clone());

        Router::new()
            .route("/block", get(block).post(block))
            .route("/transaction", get(transaction).post(transaction))
            .route("/gas-price", get(gas_price).post(gas_price))
            .route("/health", get(health))
            .method_not_allowed_fallback(method_not_allowed)
            .fallback(not_found)
            .layer(middleware)
            .with_state(state)
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::Bind(format!("{}: {}", addr, e)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Bind(e.to_string()))?;
        let app = self.build_router();

        info!(addr = %addr, "Starting HTTP server");
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn block(
    State(state): State<AppState>,
    params: RequestParams,
) -> ApiResult<QueryOutcome<ResultEnvelope>> {
    state.router.blocks(&params).await
}

async fn transaction(
    State(state): State<AppState>,
    params: RequestParams,
) -> ApiResult<QueryOutcome<ResultEnvelope>> {
    state.router.transactions(&params).await
}

async fn gas_price(
    State(state): State<AppState>,
    params: RequestParams,
) -> ApiResult<QueryOutcome<ResultsBody<GasPriceResult>>> {
    state.router.gas_price(&params).await
}

async fn health(State(state): State<AppState>) -> ApiResult<Json<ResultsBody<HealthStatus>>> {
    Ok(Json(state.router.health().await?))
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": "Not found" })),
    )
}
