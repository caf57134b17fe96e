// src/cache/memory.rs

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Mutex, time::Duration};

use super::{is_fresh, CacheKey, PayloadCache};
use crate::normalize::BlsResponse;

/// Process-local cache. Expired entries are evicted when read and swept on
/// every `put`.
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (DateTime<Utc>, BlsResponse)>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PayloadCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<BlsResponse>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("memory cache lock poisoned"))?;
        let fresh = match entries.get(key) {
            Some((fetched_at, _)) => is_fresh(*fetched_at, Utc::now(), self.ttl),
            None => return Ok(None),
        };
        if !fresh {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(_, payload)| payload.clone()))
    }

    fn put(&self, key: &CacheKey, payload: &BlsResponse) -> Result<()> {
        let now = Utc::now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("memory cache lock poisoned"))?;
        entries.retain(|_, (fetched_at, _)| is_fresh(*fetched_at, now, self.ttl));
        entries.insert(key.clone(), (now, payload.clone()));
        Ok(())
    }
}
