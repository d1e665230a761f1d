//! Redis-backed queue store
//!
//! Lists map to Redis lists (`RPUSH` / `LPOP key count`), flags to plain keys
//! with a millisecond expiry (`SET key 1 PX ttl`). `LPOP` with a count is a
//! single command, so a batch pop is atomic on the server.

use crate::store::{QueueList, QueueStore};
use crate::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::info;

/// Queue store over a multiplexed Redis connection
#[derive(Clone)]
pub struct RedisQueueStore {
    redis: ConnectionManager,
}

impl RedisQueueStore {
    /// Wrap an existing connection manager
    pub fn new(redis: ConnectionManager) -> Self {
        RedisQueueStore { redis }
    }

    /// Open a connection to `url`
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let redis = ConnectionManager::new(client).await?;

        info!("Redis queue store connected");

        Ok(Self::new(redis))
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn push(&self, list: QueueList, item: &str) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("RPUSH")
            .arg(list.key())
            .arg(item)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn pop_batch(&self, list: QueueList, max: usize) -> Result<Vec<String>> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.redis.clone();
        // Nil reply when the list is empty or missing
        let items: Option<Vec<String>> = redis::cmd("LPOP")
            .arg(list.key())
            .arg(max)
            .query_async(&mut conn)
            .await?;

        Ok(items.unwrap_or_default())
    }

    async fn set_flag(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn flag_exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.redis.clone();
        let exists: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(exists)
    }

    async fn len(&self, list: QueueList) -> Result<usize> {
        let mut conn = self.redis.clone();
        let len: usize = redis::cmd("LLEN").arg(list.key()).query_async(&mut conn).await?;
        Ok(len)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
