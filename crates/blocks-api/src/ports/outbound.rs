//! Outbound ports for the blocks API.

use crate::domain::query::{AggregateKind, BlockRange, TransactionFilter};
use crate::domain::types::{BlockNumber, Hash, Page, Row};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System time implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Counter state read back from the Counter Store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterEntry {
    /// Requests seen so far, absent when the key does not exist
    pub count: Option<u64>,
    /// Remaining lifetime, absent when the key does not exist or has no expiry
    pub ttl_remaining: Option<Duration>,
}

impl CounterEntry {
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Counter Store failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum CounterStoreError {
    /// Store could not be reached
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
    /// Stored value is not a counter
    #[error("corrupt counter {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Key-value store with per-key expiry, backing admission control.
///
/// The two calls are not atomic with respect to each other.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current count and remaining TTL of `key`
    async fn get(&self, key: &str) -> Result<CounterEntry, CounterStoreError>;

    /// Overwrite `key` with `count`, expiring after `ttl`
    async fn set_with_expiry(
        &self,
        key: &str,
        count: u64,
        ttl: Duration,
    ) -> Result<(), CounterStoreError>;
}

/// Ledger Store failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Connection or pool failure
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),
    /// Statement failed
    #[error("ledger query failed: {0}")]
    Query(String),
    /// Row could not be turned into JSON
    #[error("ledger row decode failed: {0}")]
    Decode(String),
}

/// Read-only access to persisted blocks and transactions.
///
/// Rows come back in store form: hash and address columns still carry the
/// escaped `\x` hex encoding.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Block with the given number (zero or one row)
    async fn block(&self, number: BlockNumber) -> Result<Vec<Row>, StoreError>;

    /// Blocks inside `range`, ordered by number
    async fn blocks(&self, range: &BlockRange, page: Page) -> Result<Vec<Row>, StoreError>;

    /// Number of blocks inside `range`
    async fn count_blocks(&self, range: &BlockRange) -> Result<u64, StoreError>;

    /// Transaction with the given hash (zero or one row)
    async fn transaction(&self, hash: &Hash) -> Result<Vec<Row>, StoreError>;

    /// Transactions matching `filter`, newest block first
    async fn transactions(
        &self,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Vec<Row>, StoreError>;

    /// Number of transactions matching `filter`
    async fn count_transactions(&self, filter: &TransactionFilter) -> Result<u64, StoreError>;

    /// Highest stored block number, `None` on an empty store
    async fn latest_block_number(&self) -> Result<Option<BlockNumber>, StoreError>;

    /// Gas-price aggregate over the latest `window` blocks, `None` without data
    async fn gas_price(
        &self,
        kind: AggregateKind,
        window: u64,
    ) -> Result<Option<serde_json::Number>, StoreError>;
}
