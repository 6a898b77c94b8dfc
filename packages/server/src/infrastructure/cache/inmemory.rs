//! TTL 付きインメモリキャッシュと Pub/Sub
//!
//! 期限切れのエントリは読み出し時と書き込み時に削除されます（取得できなければ
//! 呼び出し側がストアへフォールバックする前提）。`publish` されたメッセージは
//! `subscribe` で得た受信側すべてに配送されます。

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::{Mutex, broadcast},
    time::Instant,
};

use crate::domain::{CacheError, GameCache};

const PUBLISH_BUFFER: usize = 1024;

/// A message published on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePublication {
    pub channel: String,
    pub payload: String,
}

struct Entry {
    value: String,
    expires_at: Instant,
}

pub struct InMemoryGameCache {
    entries: Mutex<HashMap<String, Entry>>,
    publisher: broadcast::Sender<CachePublication>,
}

impl InMemoryGameCache {
    pub fn new() -> Self {
        let (publisher, _) = broadcast::channel(PUBLISH_BUFFER);
        Self {
            entries: Mutex::new(HashMap::new()),
            publisher,
        }
    }

    /// Receive every message published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CachePublication> {
        self.publisher.subscribe()
    }

    /// Number of stored entries, expired ones included until they are swept.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryGameCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameCache for InMemoryGameCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if entry.expires_at <= Instant::now() {
            entries.remove(key);
            tracing::debug!("Cache entry '{}' expired", key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let swept = before - entries.len();
        if swept > 0 {
            tracing::debug!("Swept {} expired cache entries", swept);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: String) -> Result<(), CacheError> {
        let publication = CachePublication {
            channel: channel.to_string(),
            payload,
        };
        // No subscribers is not an error.
        let receivers = self.publisher.send(publication).unwrap_or(0);
        tracing::debug!("Published on '{}' to {} subscribers", channel, receivers);
        Ok(())
    }
}
