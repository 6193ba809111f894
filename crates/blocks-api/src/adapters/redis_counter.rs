//! Redis-backed Counter Store, shared by every replica of the service.

use crate::ports::{CounterEntry, CounterStore, CounterStoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisError;
use std::time::Duration;
use tracing::info;

/// Counters kept as plain integer strings with a millisecond expiry
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    /// Connect to `url` (`redis://host:port/db`)
    pub async fn connect(url: &str) -> Result<Self, CounterStoreError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        info!(url = %redacted(url), "Connected to counter store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<CounterEntry, CounterStoreError> {
        let mut conn = self.conn.clone();
        let (count, pttl): (Option<u64>, i64) = redis::pipe()
            .cmd("GET")
            .arg(key)
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify(key, e))?;

        // PTTL: -2 missing key, -1 no expiry
        let ttl_remaining = u64::try_from(pttl)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        Ok(CounterEntry {
            count,
            ttl_remaining,
        })
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        count: u64,
        ttl: Duration,
    ) -> Result<(), CounterStoreError> {
        let mut conn = self.conn.clone();
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = redis::cmd("PSETEX")
            .arg(key)
            .arg(millis)
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify(key, e))?;
        Ok(())
    }
}

fn unavailable(e: RedisError) -> CounterStoreError {
    CounterStoreError::Unavailable(e.to_string())
}

fn classify(key: &str, e: RedisError) -> CounterStoreError {
    if e.kind() == redis::ErrorKind::TypeError {
        CounterStoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        }
    } else {
        unavailable(e)
    }
}

/// Strip credentials before logging a connection URL
fn redacted(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://***@{}", &url[..scheme], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
