//! Core types shared by the router, the stores and the HTTP surface.
//!
//! Hashes and addresses travel as lower-case `0x`-prefixed hex strings.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Serialize, Serializer};
use std::fmt;

/// One result row: field name to JSON value, in column order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Block number as stored (signed, matches the relational column type)
pub type BlockNumber = i64;

macro_rules! hex_string_type {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Number of hex digits, prefix excluded
            pub const HEX_LEN: usize = $len;

            /// Build from already-validated hex digits (no prefix)
            pub(crate) fn from_digits(digits: &str) -> Self {
                Self(format!("0x{}", digits.to_ascii_lowercase()))
            }

            /// `0x`-prefixed lower-case form
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Hex digits without the prefix
            pub fn digits(&self) -> &str {
                &self.0[2..]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }
    };
}

hex_string_type!(
    /// 32-byte block or transaction hash
    Hash,
    64
);

hex_string_type!(
    /// 20-byte account address
    Address,
    40
);

/// Offset/limit window derived from a 1-based page number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: u64,
    /// Rows per page
    pub size: u64,
}

impl Page {
    /// First page of the given size
    pub fn first(size: u64) -> Self {
        Self { number: 1, size }
    }

    /// Rows to skip
    pub fn offset(&self) -> u64 {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }

    /// Rows to return
    pub fn limit(&self) -> u64 {
        self.size
    }

    /// Number of pages needed for `total` rows
    pub fn pages_for(&self, total: u64) -> u64 {
        if self.size == 0 {
            return 0;
        }
        total.div_ceil(self.size)
    }
}

/// `{ page, pages, results }` body of the list resources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub page: u64,
    pub pages: u64,
    pub results: Vec<Row>,
}

impl ResultEnvelope {
    /// Envelope for a single-entity lookup
    pub fn single(results: Vec<Row>) -> Self {
        Self {
            page: 1,
            pages: 1,
            results,
        }
    }

    /// Empty envelope reporting the requested page
    pub fn empty(page: u64) -> Self {
        Self {
            page,
            pages: 0,
            results: Vec::new(),
        }
    }
}

/// `{ results }` body of the health and aggregate resources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsBody<T> {
    pub results: Option<T>,
}

/// Whether a syntactically valid query matched anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    Found,
    NotFound,
}

/// Router output: a body plus found / not-found status
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome<T> {
    pub status: LookupStatus,
    pub body: T,
}

impl<T> QueryOutcome<T> {
    pub fn found(body: T) -> Self {
        Self {
            status: LookupStatus::Found,
            body,
        }
    }

    pub fn not_found(body: T) -> Self {
        Self {
            status: LookupStatus::NotFound,
            body,
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == LookupStatus::Found
    }
}

impl<T: Serialize> IntoResponse for QueryOutcome<T> {
    fn into_response(self) -> Response {
        let status = match self.status {
            LookupStatus::Found => StatusCode::OK,
            LookupStatus::NotFound => StatusCode::NOT_FOUND,
        };
        (status, Json(self.body)).into_response()
    }
}
