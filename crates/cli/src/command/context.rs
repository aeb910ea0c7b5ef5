use crate::cache::{CacheConfig, DashboardCache};
use crate::config::HuilerieConfig;
use anyhow::{Context as AnyhowContext, Result};
use huilerie_store::Store;
use std::sync::Arc;

/// Everything a service needs to run one action: the store, the resolved
/// configuration and the shared dashboard cache.
#[derive(Clone)]
pub struct CommandContext {
    store: Store,
    config: Arc<HuilerieConfig>,
    dashboard_cache: Arc<DashboardCache>,
}

impl CommandContext {
    pub fn new(store: Store, config: HuilerieConfig) -> Self {
        let cache_cfg = CacheConfig {
            ttl: config.cache_ttl(),
            capacity: config.dashboard.cache_capacity,
        };
        Self {
            store,
            config: Arc::new(config),
            dashboard_cache: Arc::new(DashboardCache::new(cache_cfg)),
        }
    }

    /// Open the configured database file.
    pub fn open(config: HuilerieConfig) -> Result<Self> {
        let store = Store::open(&config.database.path).with_context(|| {
            format!("Failed to open database {}", config.database.path.display())
        })?;
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &HuilerieConfig {
        &self.config
    }

    pub fn dashboard_cache(&self) -> &DashboardCache {
        &self.dashboard_cache
    }

    /// Run a store operation on the blocking pool.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> huilerie_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let value = tokio::task::spawn_blocking(move || f(&store))
            .await
            .context("Store task failed")??;
        Ok(value)
    }
}
