//! `parasuite run`

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::debug;

use parasuite_common::{BrowserKind, DEFAULT_CONFIG_FILE};
use parasuite_e2e::{E2eConfig, TestRunner};

use crate::output::{self, OutputFormat};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory with YAML test specs
    #[arg(short, long)]
    pub specs: Option<PathBuf>,

    /// Run only tests with this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only the test with this name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Maximum number of tests running at once
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(short, long)]
    pub browser: Option<BrowserKind>,

    /// Per-test timeout in milliseconds (0 = none)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Output directory for results
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    /// Load the configuration file and apply command-line overrides
    pub fn resolve_config(&self) -> anyhow::Result<E2eConfig> {
        let mut config = E2eConfig::load(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;

        if let Some(specs) = &self.specs {
            config.specs_dir = specs.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.harness.concurrency = concurrency;
        }
        if let Some(browser) = self.browser {
            config.harness.session.browser = browser;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.harness.unit_timeout_ms = timeout_ms;
        }
        if let Some(output) = &self.output {
            config.harness.artifacts_dir = output.join("artifacts");
            config.screenshot_dir = output.join("screenshots");
            config.playwright.scratch_dir = output.join("sessions");
            config.harness.results_dir = output.clone();
        }

        config.harness.validate()?;
        debug!(?config, "Resolved configuration");
        Ok(config)
    }
}

/// Run the selected specs; returns `true` when no test failed.
pub async fn execute(args: RunArgs, format: OutputFormat) -> anyhow::Result<bool> {
    let config = args.resolve_config()?;
    let runner = TestRunner::new(config);

    let report = match (&args.name, &args.tag) {
        (Some(name), _) => runner.run_test(name).await?,
        (None, Some(tag)) => runner.run_tagged(tag).await?,
        (None, None) => runner.run_all().await?,
    };

    output::print_report(&report, format);
    Ok(report.is_success())
}
