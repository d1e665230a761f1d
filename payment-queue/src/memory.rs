//! In-process queue store

use crate::store::{QueueList, QueueStore};
use crate::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A thread-safe in-process queue store.
///
/// Same semantics as the Redis backend: FIFO lists, atomic batched pop (one
/// lock per call), flags that vanish after their TTL. Flag expiry follows the
/// tokio clock, so tests can pause and advance time.
#[derive(Default, Clone)]
pub struct InMemoryQueueStore {
    lists: Arc<Mutex<HashMap<QueueList, VecDeque<String>>>>,
    flags: Arc<Mutex<HashMap<String, Instant>>>,
}

impl InMemoryQueueStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a list's contents, head first
    pub async fn snapshot(&self, list: QueueList) -> Vec<String> {
        let lists = self.lists.lock().await;
        lists
            .get(&list)
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn push(&self, list: QueueList, item: &str) -> Result<()> {
        let mut lists = self.lists.lock().await;
        lists.entry(list).or_default().push_back(item.to_string());
        Ok(())
    }

    async fn pop_batch(&self, list: QueueList, max: usize) -> Result<Vec<String>> {
        let mut lists = self.lists.lock().await;
        let Some(items) = lists.get_mut(&list) else {
            return Ok(Vec::new());
        };

        let take = max.min(items.len());
        Ok(items.drain(..take).collect())
    }

    async fn set_flag(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut flags = self.flags.lock().await;
        flags.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn flag_exists(&self, key: &str) -> Result<bool> {
        let mut flags = self.flags.lock().await;
        match flags.get(key) {
            Some(expires_at) if *expires_at > Instant::now() => Ok(true),
            Some(_) => {
                flags.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn len(&self, list: QueueList) -> Result<usize> {
        let lists = self.lists.lock().await;
        Ok(lists.get(&list).map_or(0, VecDeque::len))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
