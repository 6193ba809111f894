//! Adapters for the blocks API.
//!
//! Infrastructure implementations of the outbound ports.

pub mod clock;
pub mod error_conversions;
pub mod memory_counter;
pub mod memory_ledger;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "redis")]
pub mod redis_counter;

pub use clock::ManualTimeSource;
pub use memory_counter::{cleanup_task, MemoryCounterStore};
pub use memory_ledger::{BlockRecord, MemoryLedgerStore, TransactionRecord};
#[cfg(feature = "postgres")]
pub use postgres::PgLedgerStore;
#[cfg(feature = "redis")]
pub use redis_counter::RedisCounterStore;
