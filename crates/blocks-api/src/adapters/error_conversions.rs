//! Error conversions from infrastructure types.
//!
//! Store failures become infrastructure errors; the cause is only logged.

use crate::domain::ApiError;
use crate::ports::{CounterStoreError, StoreError};

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::infrastructure(e.to_string())
    }
}

impl From<CounterStoreError> for ApiError {
    fn from(e: CounterStoreError) -> Self {
        ApiError::infrastructure(e.to_string())
    }
}
