use anyhow::{Context as AnyhowContext, Result};
use huilerie_domain::{AssignmentLimits, Millimes, PriceList};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "huilerie.toml";
pub(crate) const DB_ENV: &str = "HUILERIE_DB";

/// Runtime configuration, read from `huilerie.toml`.
///
/// Every section is optional; missing keys fall back to the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HuilerieConfig {
    pub database: DatabaseConfig,
    pub inventory: InventoryConfig,
    pub pricing: PricingConfig,
    pub payroll: PayrollConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("huilerie.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryConfig {
    pub box_count: u32,
    pub max_bulk_boxes: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        let limits = AssignmentLimits::default();
        Self {
            box_count: limits.box_count,
            max_bulk_boxes: limits.max_bulk_boxes,
        }
    }
}

/// Prices in millimes per kg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    pub small_price_per_kg: Millimes,
    pub large_price_per_kg: Millimes,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let prices = PriceList::default();
        Self {
            small_price_per_kg: prices.small_per_kg,
            large_price_per_kg: prices.large_per_kg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PayrollConfig {
    pub overtime_rate_per_hour: Millimes,
}

impl Default for PayrollConfig {
    fn default() -> Self {
        Self {
            overtime_rate_per_hour: Millimes(3_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// 0 disables the cache
    pub cache_ttl_seconds: u64,
    pub cache_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 60,
            cache_capacity: 32,
        }
    }
}

impl HuilerieConfig {
    /// Resolve the configuration: defaults, then the config file (an explicit
    /// `--config` path must exist; `./huilerie.toml` is read when present),
    /// then `HUILERIE_DB`, then the `--db` flag.
    pub fn resolve(config_path: Option<&Path>, db_flag: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(db) = std::env::var_os(DB_ENV).filter(|v| !v.is_empty()) {
            config.database.path = PathBuf::from(db);
        }
        if let Some(db) = db_flag {
            config.database.path = db.to_path_buf();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            anyhow::bail!("database.path must not be empty");
        }
        if self.inventory.box_count == 0 {
            anyhow::bail!("inventory.box_count must be at least 1");
        }
        if self.inventory.max_bulk_boxes == 0 {
            anyhow::bail!("inventory.max_bulk_boxes must be at least 1");
        }
        for (key, price) in [
            ("pricing.small_price_per_kg", self.pricing.small_price_per_kg),
            ("pricing.large_price_per_kg", self.pricing.large_price_per_kg),
        ] {
            if price.value() <= 0 {
                anyhow::bail!("{key} must be greater than zero");
            }
        }
        if self.payroll.overtime_rate_per_hour.value() < 0 {
            anyhow::bail!("payroll.overtime_rate_per_hour must not be negative");
        }
        if self.dashboard.cache_capacity == 0 {
            anyhow::bail!("dashboard.cache_capacity must be at least 1");
        }
        Ok(())
    }

    pub fn price_list(&self) -> PriceList {
        PriceList {
            small_per_kg: self.pricing.small_price_per_kg,
            large_per_kg: self.pricing.large_price_per_kg,
        }
    }

    pub fn assignment_limits(&self) -> AssignmentLimits {
        AssignmentLimits {
            box_count: self.inventory.box_count,
            max_bulk_boxes: self.inventory.max_bulk_boxes,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.dashboard.cache_ttl_seconds)
    }
}
