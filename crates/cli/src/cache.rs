use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl CacheConfig {
    fn enabled(&self) -> bool {
        !self.ttl.is_zero() && self.capacity > 0
    }
}

struct CacheEntry {
    created: Instant,
    data: Value,
}

/// Least-recently-used map with a time-to-live per entry.
///
/// `generation` moves on every `clear`, so a result computed before a clear
/// can be recognised and dropped.
struct MemCache {
    map: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    generation: u64,
}

impl MemCache {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            generation: 0,
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_front(key.to_string());
    }

    fn forget(&mut self, key: &str) {
        self.map.remove(key);
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    fn insert(&mut self, key: &str, data: Value, capacity: usize) {
        self.map.insert(
            key.to_string(),
            CacheEntry {
                created: Instant::now(),
                data,
            },
        );
        self.touch(key);
        while self.order.len() > capacity {
            if let Some(old) = self.order.pop_back() {
                self.map.remove(&old);
            }
        }
    }

    fn get(&mut self, key: &str, ttl: Duration) -> Option<Value> {
        let expired = self.map.get(key)?.created.elapsed() >= ttl;
        if expired {
            self.forget(key);
            return None;
        }
        self.touch(key);
        self.map.get(key).map(|entry| entry.data.clone())
    }

    fn clear(&mut self) -> usize {
        let dropped = self.map.len();
        self.map.clear();
        self.order.clear();
        self.generation = self.generation.wrapping_add(1);
        dropped
    }
}

/// In-memory cache of dashboard results keyed by date range. Any successful
/// write clears it.
pub struct DashboardCache {
    cfg: CacheConfig,
    inner: Mutex<MemCache>,
}

impl DashboardCache {
    pub fn new(cfg: CacheConfig) -> Self {
        Self {
            cfg,
            inner: Mutex::new(MemCache::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.cfg.enabled() {
            return None;
        }
        let mut cache = self.inner.lock().ok()?;
        cache.get(key, self.cfg.ttl)
    }

    /// Current invalidation generation. Read it before computing a result
    /// and hand it back to `insert`.
    pub fn generation(&self) -> u64 {
        match self.inner.lock() {
            Ok(cache) => cache.generation,
            Err(poisoned) => poisoned.into_inner().generation,
        }
    }

    /// Store `data` unless the cache was invalidated after `generation` was
    /// read. Returns whether the value was kept.
    pub fn insert(&self, key: &str, data: Value, generation: u64) -> bool {
        if !self.cfg.enabled() {
            return false;
        }
        match self.inner.lock() {
            Ok(mut cache) => {
                if cache.generation != generation {
                    log::debug!("Dashboard result for {key} is stale; not cached");
                    return false;
                }
                cache.insert(key, data, self.cfg.capacity);
                true
            }
            Err(_) => {
                log::warn!("Dashboard cache lock poisoned; result not cached");
                false
            }
        }
    }

    pub fn invalidate_all(&self) {
        match self.inner.lock() {
            Ok(mut cache) => {
                let dropped = cache.clear();
                if dropped > 0 {
                    log::debug!("Dashboard cache invalidated ({dropped} entries)");
                }
            }
            Err(poisoned) => {
                poisoned.into_inner().clear();
            }
        }
    }
}
