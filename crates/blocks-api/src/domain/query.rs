//! Query variants, one closed set per resource.

use crate::domain::types::{Address, BlockNumber, Hash};
use chrono::{DateTime, Utc};
use std::fmt;

/// Block resource variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockQuery {
    ByNumber(BlockNumber),
    ByNumberRange { start: BlockNumber, end: BlockNumber },
    ByTimestampRange { start: DateTime<Utc>, end: DateTime<Utc> },
}

impl BlockQuery {
    /// Range bounds for list variants, `None` for single lookups
    pub fn range(&self) -> Option<BlockRange> {
        match *self {
            BlockQuery::ByNumber(_) => None,
            BlockQuery::ByNumberRange { start, end } => Some(BlockRange::Numbers { start, end }),
            BlockQuery::ByTimestampRange { start, end } => {
                Some(BlockRange::Timestamps { start, end })
            }
        }
    }
}

/// Inclusive bounds for block list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRange {
    Numbers { start: BlockNumber, end: BlockNumber },
    Timestamps { start: DateTime<Utc>, end: DateTime<Utc> },
}

/// Transaction resource variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionQuery {
    ByHash(Hash),
    ByBlock(BlockNumber),
    ByFromAddress(Address),
    ByToAddress(Address),
    /// Either side of the transfer
    ByAddress(Address),
}

impl TransactionQuery {
    /// Filter for list variants, `None` for single lookups
    pub fn filter(&self) -> Option<TransactionFilter> {
        match self {
            TransactionQuery::ByHash(_) => None,
            TransactionQuery::ByBlock(n) => Some(TransactionFilter::Block(*n)),
            TransactionQuery::ByFromAddress(a) => Some(TransactionFilter::From(a.clone())),
            TransactionQuery::ByToAddress(a) => Some(TransactionFilter::To(a.clone())),
            TransactionQuery::ByAddress(a) => Some(TransactionFilter::Either(a.clone())),
        }
    }
}

/// Predicate for transaction list queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionFilter {
    Block(BlockNumber),
    From(Address),
    To(Address),
    Either(Address),
}

/// Aggregate applied to gas prices over a block window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateKind {
    #[default]
    Average,
    Median,
    Minimum,
    Maximum,
}

impl AggregateKind {
    /// Parse a request value, accepting common spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "average" | "avg" | "mean" => Some(AggregateKind::Average),
            "median" => Some(AggregateKind::Median),
            "min" | "minimum" => Some(AggregateKind::Minimum),
            "max" | "maximum" => Some(AggregateKind::Maximum),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateKind::Average => "average",
            AggregateKind::Median => "median",
            AggregateKind::Minimum => "min",
            AggregateKind::Maximum => "max",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gas-price resource query: one aggregate over the latest `blocks` blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPriceQuery {
    pub kind: AggregateKind,
    pub blocks: u64,
}
