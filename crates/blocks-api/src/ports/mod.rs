//! # Ports Layer
//!
//! Driven ports the service depends on: a clock, the Counter Store used for
//! admission, and the read-only Ledger Store.

pub mod outbound;

pub use outbound::{
    CounterEntry, CounterStore, CounterStoreError, LedgerStore, StoreError, SystemTimeSource,
    TimeSource,
};
