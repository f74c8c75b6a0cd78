use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

/// Denylist of logged-out session tokens. Entries vanish once their TTL ends.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn put(&self, key: &str, ttl: Duration);
    async fn exists(&self, key: &str) -> bool;
}

/// Single-process store: expired entries are dropped on read and swept on write.
#[derive(Default)]
pub struct MemoryRevocationStore {
    entries: DashMap<String, Instant>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn put(&self, key: &str, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        self.entries.retain(|_, expires| *expires > now);
        self.entries.insert(key.to_string(), now + ttl);
        debug!(revoked = self.entries.len(), "token revoked");
    }

    async fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        let live = match self.entries.get(key) {
            Some(expires) => *expires > now,
            None => return false,
        };
        if !live {
            self.entries.remove_if(key, |_, expires| *expires <= now);
        }
        live
    }
}
