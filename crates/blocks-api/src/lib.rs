//! Blocks API - read-only JSON query interface over indexed Ethereum blocks
//! and transactions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          BLOCKS API                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   GET/POST /block   /transaction   /gas-price     GET /health    │
//! │                          │                                       │
//! │  ┌───────────────────────┴──────────────────────────────────┐    │
//! │  │                    Middleware Stack                       │    │
//! │  │  Tracing → ClientIp → CORS → Admission → BodyValidation   │    │
//! │  └───────────────────────┬──────────────────────────────────┘    │
//! │                          │                                       │
//! │  ┌───────────────────────┴──────────────────────────────────┐    │
//! │  │ QueryRouter: rule selection → coercion → paging → lookup  │    │
//! │  └───────────────────────┬──────────────────────────────────┘    │
//! └──────────────────────────┼───────────────────────────────────────┘
//!                            │
//!            ┌───────────────┴───────────────┐
//!            ▼                               ▼
//!      LedgerStore                      CounterStore
//!   (PostgreSQL / memory)             (Redis / memory)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use blocks_api::{ApiConfig, ApiService};
//! use blocks_api::adapters::{PgLedgerStore, RedisCounterStore};
//!
//! let config = ApiConfig::default();
//! let ledger = PgLedgerStore::connect(&config.database_dsn()?, 10).await?;
//! let counters = RedisCounterStore::connect(&config.counter.url).await?;
//! let service = ApiService::new(config, Arc::new(ledger), Arc::new(counters))?;
//! service.start(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod middleware;
pub mod ports;
pub mod router;
pub mod service;

// Re-exports for public API
pub use domain::config::{ApiConfig, CounterBackend};
pub use domain::error::{ApiError, ApiResult, ErrorKind, ServiceError};
pub use domain::params::RequestParams;
pub use domain::types::*;
pub use ports::{CounterStore, LedgerStore, TimeSource};
pub use router::QueryRouter;
pub use service::ApiService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
