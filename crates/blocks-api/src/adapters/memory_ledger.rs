//! In-memory Ledger Store.
//!
//! Mirrors the relational adapter: hex columns are kept in the escaped `\x`
//! form, transactions only list when their block exists, and ordering
//! matches the SQL.

use crate::domain::hex_escape::prefixed_hex_to_escaped;
use crate::domain::query::{AggregateKind, BlockRange, TransactionFilter};
use crate::domain::types::{BlockNumber, Hash, Page, Row};
use crate::ports::{LedgerStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Timestamp layout used for block rows
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One persisted block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRecord {
    pub number: BlockNumber,
    pub timestamp: DateTime<Utc>,
    pub hash: String,
    pub miner: String,
    pub nonce: Number,
    pub difficulty: Number,
    pub gas_used: Number,
    pub gas_limit: Number,
    pub size: i64,
}

/// One persisted transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub hash: String,
    pub block_number: BlockNumber,
    pub from_address: String,
    /// Absent for contract creation
    pub to_address: Option<String>,
    pub value: Number,
    pub gas_price: Number,
    pub gas_limit: Number,
    pub nonce: Number,
    pub input: String,
}

#[derive(Default)]
struct Ledger {
    blocks: BTreeMap<BlockNumber, BlockRecord>,
    transactions: Vec<TransactionRecord>,
}

/// Ledger Store over in-process maps
#[derive(Default)]
pub struct MemoryLedgerStore {
    ledger: RwLock<Ledger>,
    offline: AtomicBool,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a block; hex fields are stored escaped
    pub fn insert_block(&self, mut block: BlockRecord) {
        block.hash = prefixed_hex_to_escaped(&block.hash);
        block.miner = prefixed_hex_to_escaped(&block.miner);
        self.ledger.write().blocks.insert(block.number, block);
    }

    /// Append a transaction; hex fields are stored escaped
    pub fn insert_transaction(&self, mut tx: TransactionRecord) {
        tx.hash = prefixed_hex_to_escaped(&tx.hash);
        tx.from_address = prefixed_hex_to_escaped(&tx.from_address);
        tx.to_address = tx.to_address.as_deref().map(prefixed_hex_to_escaped);
        tx.input = prefixed_hex_to_escaped(&tx.input);
        self.ledger.write().transactions.push(tx);
    }

    /// Make every call fail as if the database were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("ledger store offline".into()))
        } else {
            Ok(())
        }
    }

    fn blocks_in(ledger: &Ledger, range: &BlockRange) -> Vec<BlockRecord> {
        match *range {
            BlockRange::Numbers { start, end } => ledger
                .blocks
                .range(start..=end)
                .map(|(_, b)| b.clone())
                .collect(),
            BlockRange::Timestamps { start, end } => ledger
                .blocks
                .values()
                .filter(|b| b.timestamp >= start && b.timestamp <= end)
                .cloned()
                .collect(),
        }
    }

    /// Matching transactions joined to their block, newest block first
    fn transactions_matching(ledger: &Ledger, filter: &TransactionFilter) -> Vec<TransactionRecord> {
        let mut joined: Vec<(DateTime<Utc>, &TransactionRecord)> = ledger
            .transactions
            .iter()
            .filter(|tx| matches_filter(tx, filter))
            .filter_map(|tx| ledger.blocks.get(&tx.block_number).map(|b| (b.timestamp, tx)))
            .collect();
        joined.sort_by(|a, b| b.0.cmp(&a.0));
        joined.into_iter().map(|(_, tx)| tx.clone()).collect()
    }
}

fn address_eq(stored: &str, address: &str) -> bool {
    stored.eq_ignore_ascii_case(&prefixed_hex_to_escaped(address))
}

fn matches_filter(tx: &TransactionRecord, filter: &TransactionFilter) -> bool {
    match filter {
        TransactionFilter::Block(n) => tx.block_number == *n,
        TransactionFilter::From(a) => address_eq(&tx.from_address, a.as_str()),
        TransactionFilter::To(a) => tx
            .to_address
            .as_deref()
            .is_some_and(|to| address_eq(to, a.as_str())),
        TransactionFilter::Either(a) => {
            address_eq(&tx.from_address, a.as_str())
                || tx
                    .to_address
                    .as_deref()
                    .is_some_and(|to| address_eq(to, a.as_str()))
        }
    }
}

fn paged<T>(items: Vec<T>, page: Page) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

fn block_row(b: &BlockRecord) -> Row {
    let mut row = Row::new();
    row.insert("block_number".into(), Value::from(b.number));
    row.insert(
        "block_timestamp".into(),
        Value::String(b.timestamp.format(TIMESTAMP_FORMAT).to_string()),
    );
    row.insert("hash".into(), Value::String(b.hash.clone()));
    row.insert("miner".into(), Value::String(b.miner.clone()));
    row.insert("nonce".into(), Value::Number(b.nonce.clone()));
    row.insert("difficulty".into(), Value::Number(b.difficulty.clone()));
    row.insert("gas_used".into(), Value::Number(b.gas_used.clone()));
    row.insert("gas_limit".into(), Value::Number(b.gas_limit.clone()));
    row.insert("size".into(), Value::from(b.size));
    row
}

fn transaction_row(tx: &TransactionRecord) -> Row {
    let mut row = Row::new();
    row.insert("hash".into(), Value::String(tx.hash.clone()));
    row.insert("block_number".into(), Value::from(tx.block_number));
    row.insert("from_address".into(), Value::String(tx.from_address.clone()));
    row.insert(
        "to_address".into(),
        tx.to_address.clone().map(Value::String).unwrap_or(Value::Null),
    );
    row.insert("value".into(), Value::Number(tx.value.clone()));
    row.insert("gas_price".into(), Value::Number(tx.gas_price.clone()));
    row.insert("gas_limit".into(), Value::Number(tx.gas_limit.clone()));
    row.insert("nonce".into(), Value::Number(tx.nonce.clone()));
    row.insert("input".into(), Value::String(tx.input.clone()));
    row
}

fn to_wei(n: &Number) -> Result<u128, StoreError> {
    n.to_string()
        .parse::<u128>()
        .map_err(|e| StoreError::Decode(format!("gas_price {}: {}", n, e)))
}

/// Integer division rounding half away from zero, as a numeric-to-bigint cast does
fn div_round(sum: u128, n: u128) -> u128 {
    (sum + n / 2) / n
}

fn aggregate(kind: AggregateKind, mut prices: Vec<u128>) -> Option<u128> {
    if prices.is_empty() {
        return None;
    }
    let n = prices.len();
    match kind {
        AggregateKind::Average => Some(div_round(prices.iter().sum(), n as u128)),
        AggregateKind::Minimum => prices.iter().min().copied(),
        AggregateKind::Maximum => prices.iter().max().copied(),
        AggregateKind::Median => {
            prices.sort_unstable();
            if n % 2 == 1 {
                Some(prices[n / 2])
            } else {
                Some(div_round(prices[n / 2 - 1] + prices[n / 2], 2))
            }
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn block(&self, number: BlockNumber) -> Result<Vec<Row>, StoreError> {
        self.check_online()?;
        Ok(self.ledger.read().blocks.get(&number).map(block_row).into_iter().collect())
    }

    async fn blocks(&self, range: &BlockRange, page: Page) -> Result<Vec<Row>, StoreError> {
        self.check_online()?;
        let ledger = self.ledger.read();
        Ok(paged(Self::blocks_in(&ledger, range), page)
            .iter()
            .map(block_row)
            .collect())
    }

    async fn count_blocks(&self, range: &BlockRange) -> Result<u64, StoreError> {
        self.check_online()?;
        Ok(Self::blocks_in(&self.ledger.read(), range).len() as u64)
    }

    async fn transaction(&self, hash: &Hash) -> Result<Vec<Row>, StoreError> {
        self.check_online()?;
        let key = prefixed_hex_to_escaped(hash.as_str());
        let ledger = self.ledger.read();
        Ok(ledger
            .transactions
            .iter()
            .filter(|tx| tx.hash.eq_ignore_ascii_case(&key))
            .filter(|tx| ledger.blocks.contains_key(&tx.block_number))
            .take(1)
            .map(transaction_row)
            .collect())
    }

    async fn transactions(
        &self,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Vec<Row>, StoreError> {
        self.check_online()?;
        let ledger = self.ledger.read();
        Ok(paged(Self::transactions_matching(&ledger, filter), page)
            .iter()
            .map(transaction_row)
            .collect())
    }

    async fn count_transactions(&self, filter: &TransactionFilter) -> Result<u64, StoreError> {
        self.check_online()?;
        Ok(Self::transactions_matching(&self.ledger.read(), filter).len() as u64)
    }

    async fn latest_block_number(&self) -> Result<Option<BlockNumber>, StoreError> {
        self.check_online()?;
        Ok(self.ledger.read().blocks.keys().next_back().copied())
    }

    async fn gas_price(
        &self,
        kind: AggregateKind,
        window: u64,
    ) -> Result<Option<Number>, StoreError> {
        self.check_online()?;
        let ledger = self.ledger.read();
        let Some(latest) = ledger.blocks.keys().next_back().copied() else {
            return Ok(None);
        };
        let floor = latest.saturating_sub(i64::try_from(window).unwrap_or(i64::MAX));

        let prices = ledger
            .transactions
            .iter()
            .filter(|tx| tx.block_number > floor)
            .map(|tx| to_wei(&tx.gas_price))
            .collect::<Result<Vec<_>, _>>()?;

        aggregate(kind, prices)
            .map(|wei| {
                wei.to_string()
                    .parse::<Number>()
                    .map_err(|e| StoreError::Decode(e.to_string()))
            })
            .transpose()
    }
}
