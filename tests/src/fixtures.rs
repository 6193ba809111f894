//! Shared fixtures: a seeded ledger and a fully layered router.
//!
//! The ledger holds blocks 100..=199, twelve seconds apart from
//! 2024-05-17T00:00:00Z. Every block carries two transactions:
//! Alice → Bob and Carol → Alice. Gas prices rise by one wei per block.

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use blocks_api::adapters::{
    BlockRecord, ManualTimeSource, MemoryCounterStore, MemoryLedgerStore, TransactionRecord,
};
use blocks_api::{ApiConfig, ApiService, BlockNumber};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Number, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

pub const FIRST_BLOCK: BlockNumber = 100;
pub const LAST_BLOCK: BlockNumber = 199;
pub const BASE_GAS_PRICE: u64 = 10_000_000_000;

pub const ALICE: &str = "0x00000000000000000000000000000000000a11ce";
pub const BOB: &str = "0x0000000000000000000000000000000000000b0b";
pub const CAROL: &str = "0x00000000000000000000000000000000000ca201";

/// Peer address used when a test does not pick one
pub const DEFAULT_PEER: &str = "198.51.100.10:40000";

/// Time of block `number`
pub fn block_time(number: BlockNumber) -> DateTime<Utc> {
    let genesis = Utc.with_ymd_and_hms(2024, 5, 17, 0, 0, 0).unwrap();
    genesis + Duration::seconds(12 * (number - FIRST_BLOCK))
}

/// Block hash as the indexer stored it (upper-case digits)
pub fn block_hash(number: BlockNumber) -> String {
    format!("0x{:064X}", 0xB10C_0000_u64 + number as u64)
}

/// Transaction hash: `slot` 0 is Alice → Bob, 1 is Carol → Alice
pub fn tx_hash(number: BlockNumber, slot: u64) -> String {
    format!("0x{:064X}", 0x7A00_0000_u64 + (number as u64) * 2 + slot)
}

pub fn block(number: BlockNumber) -> BlockRecord {
    BlockRecord {
        number,
        timestamp: block_time(number),
        hash: block_hash(number),
        miner: CAROL.to_string(),
        nonce: Number::from(42),
        difficulty: Number::from(17_179_869_184_u64),
        gas_used: Number::from(42_000),
        gas_limit: Number::from(30_000_000),
        size: 1_024,
    }
}

pub fn transaction(number: BlockNumber, slot: u64) -> TransactionRecord {
    let (from, to) = if slot == 0 { (ALICE, BOB) } else { (CAROL, ALICE) };
    TransactionRecord {
        hash: tx_hash(number, slot),
        block_number: number,
        from_address: from.to_string(),
        to_address: Some(to.to_string()),
        value: Number::from(1_000_000_000_000_000_000_u64),
        gas_price: Number::from(BASE_GAS_PRICE + number as u64),
        gas_limit: Number::from(21_000),
        nonce: Number::from(number as u64),
        input: "0x".to_string(),
    }
}

/// Ledger with the standard blocks and transactions
pub fn seeded_ledger() -> Arc<MemoryLedgerStore> {
    let ledger = Arc::new(MemoryLedgerStore::new());
    for number in FIRST_BLOCK..=LAST_BLOCK {
        ledger.insert_block(block(number));
        ledger.insert_transaction(transaction(number, 0));
        ledger.insert_transaction(transaction(number, 1));
    }
    ledger
}

/// Router plus handles on its stores and clock
pub struct TestApp {
    pub router: Router,
    pub ledger: Arc<MemoryLedgerStore>,
    pub counters: Arc<MemoryCounterStore>,
    pub clock: Arc<ManualTimeSource>,
}

impl TestApp {
    /// Default configuration over the seeded ledger
    pub fn new() -> Self {
        Self::with_config(ApiConfig::default())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        Self::with_ledger(config, seeded_ledger())
    }

    pub fn with_ledger(config: ApiConfig, ledger: Arc<MemoryLedgerStore>) -> Self {
        let clock = Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2024, 5, 17, 10, 0, 0).unwrap(),
        ));
        let counters = Arc::new(MemoryCounterStore::new(clock.clone()));
        let service =
            ApiService::with_clock(config, ledger.clone(), counters.clone(), clock.clone())
                .expect("valid test configuration");

        Self {
            router: service.build_router(),
            ledger,
            counters,
            clock,
        }
    }

    /// Send one request through the full middleware stack
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = match self.router.clone().oneshot(req).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON response body")
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(get(uri)).await
    }

    pub async fn post(&self, uri: &str, json: &str) -> TestResponse {
        self.send(post(uri, json)).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoded response
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    pub fn results(&self) -> &[Value] {
        self.body["results"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// GET from the default peer
pub fn get(uri: &str) -> Request<Body> {
    request(Method::GET, uri, Body::empty())
}

/// POST a JSON body from the default peer
pub fn post(uri: &str, json: &str) -> Request<Body> {
    let mut req = request(Method::POST, uri, Body::from(json.to_string()));
    req.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("application/json"),
    );
    req
}

pub fn request(method: Method, uri: &str, body: Body) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .expect("valid request");
    from_peer(&mut req, DEFAULT_PEER);
    req
}

/// Set the direct peer address the server would see
pub fn from_peer(req: &mut Request<Body>, peer: &str) {
    let addr: SocketAddr = peer.parse().expect("socket address");
    req.extensions_mut().insert(ConnectInfo(addr));
}
