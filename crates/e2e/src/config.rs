//! Configuration file for running YAML specs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use parasuite_common::HarnessConfig;

use crate::error::E2eResult;
use crate::playwright::PlaywrightConfig;

/// Contents of `parasuite.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eConfig {
    /// Directory searched for `.yaml` / `.yml` specs
    pub specs_dir: PathBuf,

    /// Where screenshot steps write their images
    pub screenshot_dir: PathBuf,

    pub harness: HarnessConfig,

    pub playwright: PlaywrightConfig,
}

impl Default for E2eConfig {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from("tests/e2e/specs"),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            harness: HarnessConfig::default(),
            playwright: PlaywrightConfig::default(),
        }
    }
}

impl E2eConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.harness.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> E2eResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
