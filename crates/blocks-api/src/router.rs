//! Query routing: request fields to one typed query, then to the Ledger Store.
//!
//! Each resource has an ordered rule table. The first rule whose required
//! fields are all present wins; its builder coerces those fields into the
//! query variant. No rule matching is an "Invalid request".

use crate::domain::coerce::{be_address, be_datetime, be_hash, be_integer, be_string, RawValue};
use crate::domain::config::{GasPriceConfig, PaginationConfig};
use crate::domain::error::{ApiError, ApiResult};
use crate::domain::hex_escape::{normalize_hex_fields, BLOCK_HEX_FIELDS, TRANSACTION_HEX_FIELDS};
use crate::domain::params::RequestParams;
use crate::domain::query::{AggregateKind, BlockQuery, GasPriceQuery, TransactionQuery};
use crate::domain::types::{BlockNumber, Page, QueryOutcome, ResultEnvelope, ResultsBody, Row};
use crate::domain::InvalidInput;
use crate::ports::LedgerStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// One routing rule: required fields and the builder run when all are present
pub struct Rule<Q> {
    pub requires: &'static [&'static str],
    pub build: fn(&RequestParams) -> ApiResult<Q>,
}

/// Block resource rules, highest priority first
pub const BLOCK_RULES: &[Rule<BlockQuery>] = &[
    Rule {
        requires: &["block_number"],
        build: block_by_number,
    },
    Rule {
        requires: &["start", "end"],
        build: block_by_number_range,
    },
    Rule {
        requires: &["start_time", "end_time"],
        build: block_by_timestamp_range,
    },
];

/// Transaction resource rules, highest priority first.
///
/// A request carrying both `from_address` and `to_address` is a
/// `from_address` query; `to_address` is ignored.
pub const TRANSACTION_RULES: &[Rule<TransactionQuery>] = &[
    Rule {
        requires: &["hash"],
        build: transaction_by_hash,
    },
    Rule {
        requires: &["block_number"],
        build: transactions_by_block,
    },
    Rule {
        requires: &["from_address"],
        build: transactions_from,
    },
    Rule {
        requires: &["to_address"],
        build: transactions_to,
    },
    Rule {
        requires: &["address"],
        build: transactions_touching,
    },
];

/// Run the first rule whose fields are all present
pub fn select<Q>(rules: &[Rule<Q>], params: &RequestParams) -> ApiResult<Q> {
    let rule = rules
        .iter()
        .find(|rule| params.all_present(rule.requires))
        .ok_or_else(ApiError::invalid_request)?;
    (rule.build)(params)
}

fn field<T>(
    params: &RequestParams,
    name: &str,
    coerce: fn(&str, &RawValue) -> Result<T, InvalidInput>,
) -> ApiResult<T> {
    let raw = params.raw(name).ok_or_else(ApiError::invalid_request)?;
    Ok(coerce(name, &raw)?)
}

fn block_by_number(params: &RequestParams) -> ApiResult<BlockQuery> {
    Ok(BlockQuery::ByNumber(field(params, "block_number", be_integer)?))
}

fn block_by_number_range(params: &RequestParams) -> ApiResult<BlockQuery> {
    let start: BlockNumber = field(params, "start", be_integer)?;
    let end: BlockNumber = field(params, "end", be_integer)?;
    if start > end {
        return Err(ApiError::invalid_range("start", "start must come before end"));
    }
    Ok(BlockQuery::ByNumberRange { start, end })
}

fn block_by_timestamp_range(params: &RequestParams) -> ApiResult<BlockQuery> {
    let start = field(params, "start_time", be_datetime)?;
    let end = field(params, "end_time", be_datetime)?;
    if start > end {
        return Err(ApiError::invalid_range(
            "start_time",
            "start_time must come before end_time",
        ));
    }
    Ok(BlockQuery::ByTimestampRange { start, end })
}

fn transaction_by_hash(params: &RequestParams) -> ApiResult<TransactionQuery> {
    Ok(TransactionQuery::ByHash(field(params, "hash", be_hash)?))
}

fn transactions_by_block(params: &RequestParams) -> ApiResult<TransactionQuery> {
    Ok(TransactionQuery::ByBlock(field(params, "block_number", be_integer)?))
}

fn transactions_from(params: &RequestParams) -> ApiResult<TransactionQuery> {
    Ok(TransactionQuery::ByFromAddress(field(params, "from_address", be_address)?))
}

fn transactions_to(params: &RequestParams) -> ApiResult<TransactionQuery> {
    Ok(TransactionQuery::ByToAddress(field(params, "to_address", be_address)?))
}

fn transactions_touching(params: &RequestParams) -> ApiResult<TransactionQuery> {
    Ok(TransactionQuery::ByAddress(field(params, "address", be_address)?))
}

/// Requested page, 1 when absent
pub fn select_page(params: &RequestParams, page_size: u64) -> ApiResult<Page> {
    let number = match params.raw("page") {
        None => 1,
        Some(raw) => {
            let n = be_integer("page", &raw)?;
            u64::try_from(n)
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| ApiError::invalid_input("page", "Page must be 1 or greater"))?
        }
    };
    Ok(Page {
        number,
        size: page_size,
    })
}

/// Gas-price query with defaults applied and the window bounded
pub fn select_gas_price_query(
    params: &RequestParams,
    config: &GasPriceConfig,
) -> ApiResult<GasPriceQuery> {
    let kind = match params.raw("kind") {
        None => AggregateKind::default(),
        Some(raw) => AggregateKind::parse(&be_string("kind", &raw)?).ok_or_else(|| {
            ApiError::invalid_input("kind", "Expected one of average, median, min, max")
        })?,
    };

    let blocks = match params.raw("blocks") {
        None => config.default_window,
        Some(raw) => u64::try_from(be_integer("blocks", &raw)?)
            .ok()
            .filter(|n| (1..=config.max_window).contains(n))
            .ok_or_else(|| {
                ApiError::invalid_input(
                    "blocks",
                    format!("Window must be between 1 and {}", config.max_window),
                )
            })?,
    };

    Ok(GasPriceQuery { kind, blocks })
}

/// `/gas-price` result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasPriceResult {
    pub kind: &'static str,
    pub blocks: u64,
    pub gas_price: serde_json::Number,
}

/// `/health` result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub message: &'static str,
    pub block_number: BlockNumber,
}

/// Dispatches validated queries to the Ledger Store
#[derive(Clone)]
pub struct QueryRouter {
    store: Arc<dyn LedgerStore>,
    page_size: u64,
    gas_price: GasPriceConfig,
}

impl QueryRouter {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        pagination: &PaginationConfig,
        gas_price: &GasPriceConfig,
    ) -> Self {
        Self {
            store,
            page_size: pagination.page_size,
            gas_price: gas_price.clone(),
        }
    }

    /// Block resource
    pub async fn blocks(&self, params: &RequestParams) -> ApiResult<QueryOutcome<ResultEnvelope>> {
        let query = select(BLOCK_RULES, params)?;
        debug!(?query, "Block query selected");

        let Some(range) = query.range() else {
            let BlockQuery::ByNumber(number) = query else {
                return Err(ApiError::internal("block lookup without a number"));
            };
            let rows = self.store.block(number).await?;
            return Ok(single(rows, BLOCK_HEX_FIELDS));
        };

        let page = select_page(params, self.page_size)?;
        let total = self.store.count_blocks(&range).await?;
        if total == 0 {
            return Ok(QueryOutcome::not_found(ResultEnvelope::empty(page.number)));
        }
        let rows = self.store.blocks(&range, page).await?;
        Ok(listing(rows, page, total, BLOCK_HEX_FIELDS))
    }

    /// Transaction resource
    pub async fn transactions(
        &self,
        params: &RequestParams,
    ) -> ApiResult<QueryOutcome<ResultEnvelope>> {
        let query = select(TRANSACTION_RULES, params)?;
        debug!(?query, "Transaction query selected");

        let Some(filter) = query.filter() else {
            let TransactionQuery::ByHash(hash) = query else {
                return Err(ApiError::internal("transaction lookup without a hash"));
            };
            let rows = self.store.transaction(&hash).await?;
            return Ok(single(rows, TRANSACTION_HEX_FIELDS));
        };

        let page = select_page(params, self.page_size)?;
        let total = self.store.count_transactions(&filter).await?;
        if total == 0 {
            return Ok(QueryOutcome::not_found(ResultEnvelope::empty(page.number)));
        }
        let rows = self.store.transactions(&filter, page).await?;
        Ok(listing(rows, page, total, TRANSACTION_HEX_FIELDS))
    }

    /// Gas-price aggregate resource
    pub async fn gas_price(
        &self,
        params: &RequestParams,
    ) -> ApiResult<QueryOutcome<ResultsBody<GasPriceResult>>> {
        let query = select_gas_price_query(params, &self.gas_price)?;
        debug!(kind = %query.kind, blocks = query.blocks, "Gas price query selected");

        match self.store.gas_price(query.kind, query.blocks).await? {
            Some(gas_price) => Ok(QueryOutcome::found(ResultsBody {
                results: Some(GasPriceResult {
                    kind: query.kind.as_str(),
                    blocks: query.blocks,
                    gas_price,
                }),
            })),
            None => Ok(QueryOutcome::not_found(ResultsBody { results: None })),
        }
    }

    /// Health probe: the store answers and reports its latest block
    pub async fn health(&self) -> ApiResult<ResultsBody<HealthStatus>> {
        let block_number = self.store.latest_block_number().await?.unwrap_or(0);
        Ok(ResultsBody {
            results: Some(HealthStatus {
                message: "ok",
                block_number,
            }),
        })
    }
}

fn single(mut rows: Vec<Row>, hex_fields: &[&str]) -> QueryOutcome<ResultEnvelope> {
    if rows.is_empty() {
        return QueryOutcome::not_found(ResultEnvelope {
            page: 1,
            pages: 1,
            results: rows,
        });
    }
    normalize_hex_fields(&mut rows, hex_fields);
    QueryOutcome::found(ResultEnvelope::single(rows))
}

fn listing(
    mut rows: Vec<Row>,
    page: Page,
    total: u64,
    hex_fields: &[&str],
) -> QueryOutcome<ResultEnvelope> {
    let pages = page.pages_for(total);
    if rows.is_empty() {
        return QueryOutcome::not_found(ResultEnvelope {
            page: page.number,
            pages,
            results: rows,
        });
    }
    normalize_hex_fields(&mut rows, hex_fields);
    QueryOutcome::found(ResultEnvelope {
        page: page.number,
        pages,
        results: rows,
    })
}
