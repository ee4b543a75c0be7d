#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a C1 Terminal match over stdin and stdout.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use frontline_system_controller::{StrategyConfig, TurnController};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "frontline=info";

/// Turn-based decision engine for the C1 Terminal tower-defense game.
#[derive(Parser, Debug)]
#[command(name = "frontline")]
struct Args {
    /// Strategy tuning file (TOML); built-in defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for deterministic matches; overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter directive; falls back to RUST_LOG, then `frontline=info`
    #[arg(long)]
    log_filter: Option<String>,
}

/// Entry point for the Frontline command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_filter.as_deref())?;

    let config = match &args.config {
        Some(path) => StrategyConfig::load(path)
            .with_context(|| format!("failed to load strategy from {}", path.display()))?,
        None => StrategyConfig::default(),
    };
    let seed = args
        .seed
        .or(config.seed)
        .unwrap_or_else(rand::random::<u64>);
    tracing::info!(seed, "frontline starting");

    let controller = TurnController::new(config, seed);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let _ = frontline_cli::run(stdin.lock(), stdout.lock(), controller)?;
    Ok(())
}

fn init_logging(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
    Ok(())
}
