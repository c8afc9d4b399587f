//! `parasuite list`

use std::path::PathBuf;

use clap::Args;

use parasuite_common::DEFAULT_CONFIG_FILE;
use parasuite_e2e::{E2eConfig, TestSpec};

use crate::output::{self, OutputFormat};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory with YAML test specs
    #[arg(short, long)]
    pub specs: Option<PathBuf>,

    /// Show only tests with this tag
    #[arg(short, long)]
    pub tag: Option<String>,
}

pub fn execute(args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = E2eConfig::load(&args.config)?;
    let dir = args.specs.unwrap_or(config.specs_dir);

    let specs = TestSpec::load_all(&dir)?;
    let selected: Vec<TestSpec> = match &args.tag {
        Some(tag) => TestSpec::filter_by_tag(&specs, tag).into_iter().cloned().collect(),
        None => specs,
    };

    output::print_list(&selected, format);
    Ok(())
}
