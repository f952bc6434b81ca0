//! Adapter configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridError, GridResult};
use crate::playwright::PlaywrightConfig;
use crate::selectors::StockSelectors;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Back-office root, e.g. `http://localhost:8001/admin-dev`
    pub base_url: String,

    /// Path of the stock page relative to `base_url`
    pub stock_path: String,

    /// Wait bounds
    pub sync: SyncConfig,

    /// Page selectors
    pub selectors: StockSelectors,

    /// Browser settings
    pub playwright: PlaywrightConfig,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8001/admin-dev".to_string(),
            stock_path: "/index.php/sell/stocks/".to_string(),
            sync: SyncConfig::default(),
            selectors: StockSelectors::default(),
            playwright: PlaywrightConfig::default(),
        }
    }
}

/// Bounds for every wait the adapter performs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound for any wait (loader hidden, notification shown, ...)
    pub timeout_ms: u64,

    /// How long to look for a loader to appear before assuming the
    /// round trip finished faster than it could be observed
    pub appear_grace_ms: u64,

    /// Polling period for drivers that poll
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            appear_grace_ms: 1_500,
            poll_interval_ms: 50,
        }
    }
}

impl SyncConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn appear_grace(&self) -> Duration {
        Duration::from_millis(self.appear_grace_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> GridResult<()> {
        if self.timeout_ms == 0 {
            return Err(GridError::Config("sync.timeout_ms must be positive".into()));
        }
        if self.appear_grace_ms > self.timeout_ms {
            return Err(GridError::Config(format!(
                "sync.appear_grace_ms ({}) exceeds sync.timeout_ms ({})",
                self.appear_grace_ms, self.timeout_ms
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(GridError::Config("sync.poll_interval_ms must be positive".into()));
        }
        Ok(())
    }
}

impl GridConfig {
    /// Load configuration from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> GridResult<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.sync.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> GridResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GridError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `STOCKGRID_*` environment overrides
    pub fn apply_env(&mut self) -> GridResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) -> GridResult<()> {
        if let Some(url) = get("STOCKGRID_BASE_URL") {
            self.base_url = url;
        }
        if let Some(ms) = get("STOCKGRID_SYNC_TIMEOUT_MS") {
            self.sync.timeout_ms = parse_env("STOCKGRID_SYNC_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = get("STOCKGRID_APPEAR_GRACE_MS") {
            self.sync.appear_grace_ms = parse_env("STOCKGRID_APPEAR_GRACE_MS", &ms)?;
        }
        if let Some(flag) = get("STOCKGRID_HEADLESS") {
            self.playwright.headless = !matches!(flag.as_str(), "0" | "false" | "no");
        }
        self.sync.validate()
    }

    /// Absolute URL of the stock page
    pub fn stock_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.stock_path.trim_start_matches('/')
        )
    }
}

fn parse_env(key: &str, value: &str) -> GridResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| GridError::Config(format!("{} must be an integer, got {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GridConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.sync.timeout_ms, 10_000);
        assert_eq!(config.selectors, StockSelectors::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/stockgrid.toml");

        let mut config = GridConfig::default();
        config.base_url = "http://shop.test/admin123".into();
        config.sync.appear_grace_ms = 300;
        config.save(&path).unwrap();

        let loaded = GridConfig::load(&path).unwrap();
        assert_eq!(loaded.base_url, "http://shop.test/admin123");
        assert_eq!(loaded.sync.appear_grace_ms, 300);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockgrid.toml");
        std::fs::write(&path, "[sync]\ntimeout_ms = 2500\n").unwrap();

        let config = GridConfig::load(&path).unwrap();
        assert_eq!(config.sync.timeout(), Duration::from_millis(2500));
        assert_eq!(config.sync.poll_interval_ms, 50);
    }

    #[test]
    fn test_grace_longer_than_timeout_rejected() {
        let sync = SyncConfig {
            timeout_ms: 100,
            appear_grace_ms: 500,
            poll_interval_ms: 10,
        };
        assert!(matches!(sync.validate(), Err(GridError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOCKGRID_BASE_URL", "http://ci.local/admin"),
            ("STOCKGRID_SYNC_TIMEOUT_MS", "30000"),
            ("STOCKGRID_HEADLESS", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = GridConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.base_url, "http://ci.local/admin");
        assert_eq!(config.sync.timeout_ms, 30_000);
        assert!(!config.playwright.headless);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = GridConfig::default();
        let err = config
            .apply_overrides(|k| (k == "STOCKGRID_APPEAR_GRACE_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("STOCKGRID_APPEAR_GRACE_MS"));
    }

    #[test]
    fn test_stock_url_joins_slashes() {
        let mut config = GridConfig::default();
        config.base_url = "http://shop.test/admin/".into();
        assert_eq!(config.stock_url(), "http://shop.test/admin/index.php/sell/stocks/");
    }
}
