//! # Autonomy Configuration Check
//!
//! Loads the layered configuration the same way the runtime does, validates it and prints
//! the sanitized result. Exits non-zero when loading or validation fails.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use tms_autonomy::config::ConfigManager;

#[derive(Parser)]
#[command(name = "autonomy-config-check")]
#[command(about = "Validate TMS autonomy configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Environment overlay to apply (defaults to AUTONOMY_ENV / APP_ENV)
    #[arg(short, long)]
    environment: Option<String>,

    /// Configuration directory (defaults to AUTONOMY_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .context("failed to load configuration")?;

    info!(
        environment = %manager.environment(),
        config_directory = %manager.config_directory().display(),
        "Configuration loaded"
    );

    println!("Environment: {}", manager.environment());
    println!("Config Directory: {}", manager.config_directory().display());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&manager.debug_config())
            .context("failed to render configuration")?
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let _ = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    if let Err(e) = run(&cli) {
        error!("Configuration check failed: {e:#}");
        eprintln!("❌ {e:#}");
        process::exit(1);
    }
    println!("✅ Configuration is valid");
}
