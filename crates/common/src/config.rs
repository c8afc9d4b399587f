//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::SessionConfig;
use crate::{Error, Result};

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Suite name carried on suite-level events and reports
    pub suite_name: String,

    /// Maximum number of contexts running at once
    pub concurrency: usize,

    /// Per-unit body timeout in milliseconds (0 = none)
    pub unit_timeout_ms: u64,

    /// Where failure artifacts are written
    pub artifacts_dir: PathBuf,

    /// Where suite reports are written
    pub results_dir: PathBuf,

    /// Options for every session the suite opens
    pub session: SessionConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            suite_name: "default".to_string(),
            concurrency: 2,
            unit_timeout_ms: 0,
            artifacts_dir: PathBuf::from("test-results/artifacts"),
            results_dir: PathBuf::from("test-results"),
            session: SessionConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.suite_name.trim().is_empty() {
            return Err(Error::InvalidConfig("suite_name is empty".to_string()));
        }
        Ok(())
    }

    pub fn unit_timeout(&self) -> Option<Duration> {
        match self.unit_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BrowserKind, WindowState};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = HarnessConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.concurrency, 2);
        assert!(config.unit_timeout().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/parasuite.toml");

        let mut config = HarnessConfig::default();
        config.suite_name = "checkout".to_string();
        config.concurrency = 4;
        config.unit_timeout_ms = 30_000;
        config.session.browser = BrowserKind::Firefox;
        config.session.window_state = WindowState::Maximized;
        config.save(&path).unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.unit_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("parasuite.toml");
        std::fs::write(&path, "suite_name = \"smoke\"\n\n[session]\nbrowser = \"webkit\"\n").unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.suite_name, "smoke");
        assert_eq!(config.session.browser, BrowserKind::Webkit);
        assert_eq!(config.concurrency, 2);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("parasuite.toml");
        std::fs::write(&path, "concurrency = 0\n").unwrap();

        assert!(matches!(
            HarnessConfig::load(&path),
            Err(Error::InvalidConfig(_))
        ));
    }
}
