//! Domain types for the blocks API.
//!
//! Configuration, errors, input coercion and the query model. Nothing here
//! touches a socket or a database.

pub mod coerce;
pub mod config;
pub mod error;
pub mod hex_escape;
pub mod params;
pub mod query;
pub mod types;

// Re-exports for convenience
pub use coerce::{FieldKind, InvalidInput, RawValue, ValidatedField};
pub use config::{ApiConfig, ConfigError, CounterBackend};
pub use error::{ApiError, ApiResult, ErrorKind, ServiceError};
pub use params::RequestParams;
pub use query::{
    AggregateKind, BlockQuery, BlockRange, GasPriceQuery, TransactionFilter, TransactionQuery,
};
pub use types::*;
