//! `parasuite init-config`

use std::path::PathBuf;

use clap::Args;

use parasuite_common::DEFAULT_CONFIG_FILE;
use parasuite_e2e::E2eConfig;

use crate::output;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub path: PathBuf,

    /// Replace an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn execute(args: InitArgs) -> anyhow::Result<()> {
    if args.path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.path.display()
        );
    }

    E2eConfig::default().save(&args.path)?;
    output::print_success(&format!("Wrote {}", args.path.display()));
    Ok(())
}
