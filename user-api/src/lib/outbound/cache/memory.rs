use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::cache::errors::CacheError;
use crate::domain::cache::models::CacheKey;
use crate::domain::cache::ports::Cache;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// Entry count at which a write first sweeps out expired entries.
const DEFAULT_SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug)]
struct Entries {
    map: HashMap<String, Entry>,
    sweep_threshold: usize,
    next_sweep: usize,
}

impl Entries {
    fn sweep_if_due(&mut self, now: Instant) {
        if self.map.len() < self.next_sweep {
            return;
        }

        let before = self.map.len();
        self.map.retain(|_, entry| entry.is_live(now));
        // Live entries alone may exceed the threshold; wait for the map to double.
        self.next_sweep = self.sweep_threshold.max(self.map.len() * 2);

        tracing::debug!(
            removed = before - self.map.len(),
            remaining = self.map.len(),
            "Swept expired cache entries"
        );
    }
}

/// In-process cache used when Redis is disabled.
///
/// Expired entries are never returned. They are removed when their key is read,
/// and in bulk by a write once the map reaches the sweep threshold.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: Arc<RwLock<Entries>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_sweep_threshold(DEFAULT_SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(sweep_threshold: usize) -> Self {
        let sweep_threshold = sweep_threshold.max(1);

        Self {
            entries: Arc::new(RwLock::new(Entries {
                map: HashMap::new(),
                sweep_threshold,
                next_sweep: sweep_threshold,
            })),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| now + ttl),
        };

        let mut entries = self.entries.write().await;
        entries.sweep_if_due(now);
        entries.map.insert(key.as_str().to_string(), entry);

        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let now = Instant::now();

        if let Some(entry) = self.entries.read().await.map.get(key.as_str()) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        // Expired: remove unless it was replaced in the meantime.
        let mut entries = self.entries.write().await;
        if entries
            .map
            .get(key.as_str())
            .is_some_and(|entry| !entry.is_live(now))
        {
            entries.map.remove(key.as_str());
        }

        Ok(None)
    }
}
