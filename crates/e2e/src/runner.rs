//! Runs YAML specs as a Parasuite suite

use std::sync::Arc;
use tracing::info;

use parasuite_common::{FsArtifactStore, SessionFactory, SuiteReport, SuiteRunner};

use crate::config::E2eConfig;
use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightFactory;
use crate::spec::TestSpec;
use crate::unit::SpecUnit;

/// Loads specs and runs them through a [`SuiteRunner`]
pub struct TestRunner {
    config: E2eConfig,
}

impl TestRunner {
    pub fn new(config: E2eConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &E2eConfig {
        &self.config
    }

    /// Load every spec in the configured directory
    pub fn load_specs(&self) -> E2eResult<Vec<TestSpec>> {
        TestSpec::load_all(&self.config.specs_dir)
    }

    /// Run all tests in the specs directory
    pub async fn run_all(&self) -> E2eResult<SuiteReport> {
        let specs = self.load_specs()?;
        self.run_specs(specs).await
    }

    /// Run tests matching a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteReport> {
        let specs: Vec<TestSpec> = self
            .load_specs()?
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect();
        self.run_specs(specs).await
    }

    /// Run a specific test by name
    pub async fn run_test(&self, name: &str) -> E2eResult<SuiteReport> {
        let spec = self
            .load_specs()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;
        self.run_specs(vec![spec]).await
    }

    /// Run specs against real Playwright sessions
    pub async fn run_specs(&self, specs: Vec<TestSpec>) -> E2eResult<SuiteReport> {
        let factory = PlaywrightFactory::new(self.config.playwright.clone())?;
        self.run_with_factory(specs, Arc::new(factory)).await
    }

    /// Run specs against sessions from `factory`, then write the report
    pub async fn run_with_factory(
        &self,
        specs: Vec<TestSpec>,
        factory: Arc<dyn SessionFactory>,
    ) -> E2eResult<SuiteReport> {
        let harness = &self.config.harness;
        let store = FsArtifactStore::new(&harness.artifacts_dir).await?;

        let runner = SuiteRunner::builder(harness.clone())
            .with_session_factory(factory)
            .with_log_observer()
            .with_failure_capture(Arc::new(store))
            .build()?;

        info!("Running {} test(s)...", specs.len());
        let units = SpecUnit::from_specs(specs, self.config.screenshot_dir.clone());
        let report = runner.run_configured(units).await?;

        report.write_json(&harness.results_dir)?;
        Ok(report)
    }
}
