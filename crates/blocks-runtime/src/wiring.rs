//! Adapter selection and service lifecycle.

use anyhow::Result;
use blocks_api::adapters::{cleanup_task, MemoryCounterStore, PgLedgerStore, RedisCounterStore};
use blocks_api::ports::SystemTimeSource;
use blocks_api::{ApiConfig, ApiService, CounterBackend, CounterStore, LedgerStore, ServiceError};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Connected storage backends
pub struct Stores {
    pub ledger: Arc<dyn LedgerStore>,
    pub counters: Arc<dyn CounterStore>,
    /// Set when counters live in process memory and need housekeeping
    pub memory_counters: Option<Arc<MemoryCounterStore>>,
}

/// Connect the Ledger Store and the configured Counter Store
pub async fn connect_stores(config: &ApiConfig) -> Result<Stores> {
    let dsn = config.database_dsn()?;
    let ledger = PgLedgerStore::connect(&dsn, config.database.max_connections)
        .await
        .map_err(|e| ServiceError::Store(format!("ledger store: {}", e)))?;

    let mut memory_counters = None;
    let counters: Arc<dyn CounterStore> = match config.counter.backend {
        CounterBackend::Redis => {
            let store = RedisCounterStore::connect(&config.counter.url)
                .await
                .map_err(|e| ServiceError::Store(format!("counter store: {}", e)))?;
            Arc::new(store)
        }
        CounterBackend::Memory => {
            warn!("Using in-process counter store; counts are not shared between replicas");
            let store = Arc::new(MemoryCounterStore::new(Arc::new(SystemTimeSource)));
            memory_counters = Some(Arc::clone(&store));
            store
        }
    };

    Ok(Stores {
        ledger: Arc::new(ledger),
        counters,
        memory_counters,
    })
}

/// Serve until `shutdown` resolves
pub async fn run<F>(config: ApiConfig, stores: Stores, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cleanup: Option<JoinHandle<()>> = stores.memory_counters.map(|store| {
        let interval = config.rate_limit.window;
        tokio::spawn(cleanup_task(store, interval))
    });

    info!(
        addr = %config.http_addr(),
        limit = config.rate_limit.limit,
        window_secs = config.rate_limit.window.as_secs(),
        page_size = config.pagination.page_size,
        "Starting Blocks API v{}",
        blocks_api::VERSION
    );

    let service = ApiService::new(config, stores.ledger, stores.counters)?;
    let result = service.start(shutdown).await;

    if let Some(handle) = cleanup {
        handle.abort();
    }
    result?;
    Ok(())
}
