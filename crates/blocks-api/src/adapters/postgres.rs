//! PostgreSQL Ledger Store.
//!
//! Reads the `block` and `transaction` tables. Hash and address columns are
//! text holding `\x`-escaped hex; numeric columns are fetched as text so
//! wei-sized values survive untouched.

use crate::domain::hex_escape::prefixed_hex_to_escaped;
use crate::domain::query::{AggregateKind, BlockRange, TransactionFilter};
use crate::domain::types::{BlockNumber, Hash, Page, Row};
use crate::ports::{LedgerStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Number, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row as _};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
enum Column {
    Int(&'static str),
    Numeric(&'static str),
    Text(&'static str),
    Timestamp(&'static str),
}

impl Column {
    fn name(self) -> &'static str {
        match self {
            Column::Int(n) | Column::Numeric(n) | Column::Text(n) | Column::Timestamp(n) => n,
        }
    }

    fn select_expr(self, qualifier: &str) -> String {
        match self {
            Column::Int(n) => format!("{q}{n}::bigint AS {n}", q = qualifier),
            Column::Numeric(n) => format!("{q}{n}::text AS {n}", q = qualifier),
            Column::Text(n) => format!("{q}{n} AS {n}", q = qualifier),
            Column::Timestamp(n) => format!(
                "to_char({q}{n}, 'YYYY-MM-DD\"T\"HH24:MI:SS') AS {n}",
                q = qualifier
            ),
        }
    }

    fn decode(self, row: &PgRow) -> Result<Value, StoreError> {
        let name = self.name();
        let decode_err = |e: sqlx::Error| StoreError::Decode(format!("column '{}': {}", name, e));
        match self {
            Column::Int(_) => Ok(row
                .try_get::<Option<i64>, _>(name)
                .map_err(decode_err)?
                .map(Value::from)
                .unwrap_or(Value::Null)),
            Column::Numeric(_) => match row.try_get::<Option<String>, _>(name).map_err(decode_err)? {
                Some(text) => text
                    .parse::<Number>()
                    .map(Value::Number)
                    .map_err(|e| StoreError::Decode(format!("column '{}': {}", name, e))),
                None => Ok(Value::Null),
            },
            Column::Text(_) | Column::Timestamp(_) => Ok(row
                .try_get::<Option<String>, _>(name)
                .map_err(decode_err)?
                .map(Value::String)
                .unwrap_or(Value::Null)),
        }
    }
}

const BLOCK_COLUMNS: &[Column] = &[
    Column::Int("block_number"),
    Column::Timestamp("block_timestamp"),
    Column::Text("hash"),
    Column::Text("miner"),
    Column::Numeric("nonce"),
    Column::Numeric("difficulty"),
    Column::Numeric("gas_used"),
    Column::Numeric("gas_limit"),
    Column::Int("size"),
];

const TRANSACTION_COLUMNS: &[Column] = &[
    Column::Text("hash"),
    Column::Int("block_number"),
    Column::Text("from_address"),
    Column::Text("to_address"),
    Column::Numeric("value"),
    Column::Numeric("gas_price"),
    Column::Numeric("gas_limit"),
    Column::Numeric("nonce"),
    Column::Text("input"),
];

fn select_list(columns: &[Column], qualifier: &str) -> String {
    columns
        .iter()
        .map(|c| c.select_expr(qualifier))
        .collect::<Vec<_>>()
        .join(", ")
}

fn decode_rows(rows: &[PgRow], columns: &[Column]) -> Result<Vec<Row>, StoreError> {
    rows.iter()
        .map(|pg_row| {
            let mut row = Row::new();
            for column in columns {
                row.insert(column.name().to_string(), column.decode(pg_row)?);
            }
            Ok(row)
        })
        .collect()
}

fn to_store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(e.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Decode(e.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

fn as_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Bound parameter for a dynamic predicate
enum Bind {
    Int(i64),
    Text(String),
    Instant(DateTime<Utc>),
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

fn bind_all<'q>(mut query: PgQuery<'q>, binds: Vec<Bind>) -> PgQuery<'q> {
    for bind in binds {
        query = match bind {
            Bind::Int(v) => query.bind(v),
            Bind::Text(v) => query.bind(v),
            Bind::Instant(v) => query.bind(v),
        };
    }
    query
}

/// `WHERE` body for a block range, parameters starting at `$1`
fn block_predicate(range: &BlockRange) -> (&'static str, Vec<Bind>) {
    match *range {
        BlockRange::Numbers { start, end } => (
            "block_number BETWEEN $1 AND $2",
            vec![Bind::Int(start), Bind::Int(end)],
        ),
        BlockRange::Timestamps { start, end } => (
            "block_timestamp BETWEEN $1 AND $2",
            vec![Bind::Instant(start), Bind::Instant(end)],
        ),
    }
}

/// `WHERE` body for a transaction filter, parameters starting at `$1`
fn transaction_predicate(filter: &TransactionFilter) -> (&'static str, Vec<Bind>) {
    match filter {
        TransactionFilter::Block(n) => ("t.block_number = $1", vec![Bind::Int(*n)]),
        TransactionFilter::From(a) => (
            "lower(t.from_address) = lower($1)",
            vec![Bind::Text(prefixed_hex_to_escaped(a.as_str()))],
        ),
        TransactionFilter::To(a) => (
            "lower(t.to_address) = lower($1)",
            vec![Bind::Text(prefixed_hex_to_escaped(a.as_str()))],
        ),
        TransactionFilter::Either(a) => (
            "(lower(t.from_address) = lower($1) OR lower(t.to_address) = lower($1))",
            vec![Bind::Text(prefixed_hex_to_escaped(a.as_str()))],
        ),
    }
}

fn aggregate_expr(kind: AggregateKind) -> &'static str {
    match kind {
        AggregateKind::Average => "AVG(t.gas_price)",
        AggregateKind::Median => "percentile_cont(0.5) WITHIN GROUP (ORDER BY t.gas_price)",
        AggregateKind::Minimum => "MIN(t.gas_price)",
        AggregateKind::Maximum => "MAX(t.gas_price)",
    }
}

/// Ledger Store over a PostgreSQL pool
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Open a pool against `dsn`
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(dsn)
            .await
            .map_err(to_store_error)?;
        info!(max_connections, "Connected to ledger store");
        Ok(Self { pool })
    }

    async fn fetch(
        &self,
        sql: &str,
        binds: Vec<Bind>,
        columns: &[Column],
    ) -> Result<Vec<Row>, StoreError> {
        debug!(sql, "Ledger query");
        let rows = bind_all(sqlx::query(sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(to_store_error)?;
        decode_rows(&rows, columns)
    }

    async fn count(&self, sql: &str, binds: Vec<Bind>) -> Result<u64, StoreError> {
        debug!(sql, "Ledger count");
        let row = bind_all(sqlx::query(sql), binds)
            .fetch_one(&self.pool)
            .await
            .map_err(to_store_error)?;
        let total: i64 = row.try_get(0).map_err(to_store_error)?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn block(&self, number: BlockNumber) -> Result<Vec<Row>, StoreError> {
        let sql = format!(
            "SELECT {} FROM block WHERE block_number = $1",
            select_list(BLOCK_COLUMNS, "")
        );
        self.fetch(&sql, vec![Bind::Int(number)], BLOCK_COLUMNS).await
    }

    async fn blocks(&self, range: &BlockRange, page: Page) -> Result<Vec<Row>, StoreError> {
        let (predicate, mut binds) = block_predicate(range);
        let sql = format!(
            "SELECT {} FROM block WHERE {} ORDER BY block_number LIMIT $3 OFFSET $4",
            select_list(BLOCK_COLUMNS, ""),
            predicate
        );
        binds.push(Bind::Int(as_i64(page.limit())));
        binds.push(Bind::Int(as_i64(page.offset())));
        self.fetch(&sql, binds, BLOCK_COLUMNS).await
    }

    async fn count_blocks(&self, range: &BlockRange) -> Result<u64, StoreError> {
        let (predicate, binds) = block_predicate(range);
        let sql = format!("SELECT COUNT(*) FROM block WHERE {}", predicate);
        self.count(&sql, binds).await
    }

    async fn transaction(&self, hash: &Hash) -> Result<Vec<Row>, StoreError> {
        let sql = format!(
            "SELECT {} FROM transaction t JOIN block b USING (block_number) \
             WHERE lower(t.hash) = lower($1) LIMIT 1",
            select_list(TRANSACTION_COLUMNS, "t.")
        );
        let key = prefixed_hex_to_escaped(hash.as_str());
        self.fetch(&sql, vec![Bind::Text(key)], TRANSACTION_COLUMNS)
            .await
    }

    async fn transactions(
        &self,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Vec<Row>, StoreError> {
        let (predicate, mut binds) = transaction_predicate(filter);
        let next = binds.len() + 1;
        let sql = format!(
            "SELECT {} FROM transaction t JOIN block b USING (block_number) \
             WHERE {} ORDER BY b.block_timestamp DESC LIMIT ${} OFFSET ${}",
            select_list(TRANSACTION_COLUMNS, "t."),
            predicate,
            next,
            next + 1
        );
        binds.push(Bind::Int(as_i64(page.limit())));
        binds.push(Bind::Int(as_i64(page.offset())));
        self.fetch(&sql, binds, TRANSACTION_COLUMNS).await
    }

    async fn count_transactions(&self, filter: &TransactionFilter) -> Result<u64, StoreError> {
        let (predicate, binds) = transaction_predicate(filter);
        let sql = format!(
            "SELECT COUNT(*) FROM transaction t JOIN block b USING (block_number) WHERE {}",
            predicate
        );
        self.count(&sql, binds).await
    }

    async fn latest_block_number(&self) -> Result<Option<BlockNumber>, StoreError> {
        let row = sqlx::query("SELECT MAX(block_number)::bigint FROM block")
            .fetch_one(&self.pool)
            .await
            .map_err(to_store_error)?;
        row.try_get::<Option<i64>, _>(0).map_err(to_store_error)
    }

    async fn gas_price(
        &self,
        kind: AggregateKind,
        window: u64,
    ) -> Result<Option<Number>, StoreError> {
        let sql = format!(
            "SELECT ROUND(({})::numeric)::text FROM transaction t \
             WHERE t.block_number > (SELECT MAX(block_number) FROM block) - $1",
            aggregate_expr(kind)
        );
        debug!(sql, "Ledger aggregate");
        let row = sqlx::query(&sql)
            .bind(as_i64(window))
            .fetch_one(&self.pool)
            .await
            .map_err(to_store_error)?;
        row.try_get::<Option<String>, _>(0)
            .map_err(to_store_error)?
            .map(|text| {
                text.parse::<Number>()
                    .map_err(|e| StoreError::Decode(format!("gas_price: {}", e)))
            })
            .transpose()
    }
}
