//! Parasuite CLI - Main Entry Point
//!
//! Exit codes: 0 when every test passed or was skipped, 1 when a test
//! failed, 2 when the harness itself could not run.

use clap::{Parser, Subcommand};

use parasuite_cli::commands::{init, list, run};
use parasuite_cli::output::{self, OutputFormat};

/// Parasuite - parallel browser test runner
#[derive(Parser)]
#[command(name = "parasuite")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run test specs
    Run(run::RunArgs),

    /// List test specs
    List(list::ListArgs),

    /// Write a default configuration file
    InitConfig(init::InitArgs),

    /// Show version information
    Version,
}

const EXIT_FAILED: i32 = 1;
const EXIT_HARNESS_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run(args) => run::execute(args, cli.format).await,
        Commands::List(args) => list::execute(args, cli.format).map(|_| true),
        Commands::InitConfig(args) => init::execute(args).map(|_| true),
        Commands::Version => {
            println!("Parasuite CLI v{}", parasuite_common::VERSION);
            println!("Parallel test runner with one browser session per test");
            Ok(true)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_FAILED),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            std::process::exit(EXIT_HARNESS_ERROR);
        }
    }
}
