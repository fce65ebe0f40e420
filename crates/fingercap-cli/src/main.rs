//! fingercap - scripted fingerprint capture sessions
//!
//! Runs a capture session against the mock scanner with a scripted
//! operator, logs every screen update and prints the outcome as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fingercap_core::{CaptureSettings, ConfigStore, TomlConfigStore};
use fingercap_engine::{CaptureContext, CaptureWorkflow};
use fingercap_hardware::mock::MockScanner;
use tracing::{info, warn};

mod scenario;

use scenario::Scenario;

/// fingercap - scripted fingerprint capture sessions
#[derive(Parser, Debug)]
#[command(name = "fingercap")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Capture settings file (TOML); built-in defaults when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum quality for a good scan (40-99)
    #[arg(long)]
    threshold: Option<u8>,

    /// Continuous-capture timeout in seconds (1-10)
    #[arg(long)]
    timeout: Option<u64>,

    /// Operator script to run
    #[arg(long, value_enum, default_value_t = Scenario::Happy)]
    scenario: Scenario,
}

fn load_settings(cli: &Cli) -> Result<CaptureSettings> {
    let mut settings = match &cli.config {
        Some(path) => TomlConfigStore::new(path)
            .load()
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => CaptureSettings::default(),
    };

    if let Some(threshold) = cli.threshold {
        settings.quality_threshold = threshold;
    }
    if let Some(timeout) = cli.timeout {
        settings.capture_timeout_secs = timeout;
    }

    settings.validate().context("Invalid capture settings")?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    info!("fingercap v{}", fingercap_core::VERSION);

    let settings = load_settings(&cli)?;
    info!(
        "Quality threshold {}, capture timeout {}s, scenario {:?}",
        settings.quality_threshold, settings.capture_timeout_secs, cli.scenario
    );

    let (scanner, scanner_handle) = MockScanner::new();
    let context = CaptureContext::new(scanner.into(), settings)
        .await
        .context("Failed to open capture session")?;
    let (workflow, handle) = CaptureWorkflow::new(context)?;

    let session = tokio::spawn(workflow.run());

    if let Err(e) = scenario::run(cli.scenario, handle, &scanner_handle).await {
        warn!("Operator script stopped early: {}", e);
    }

    let outcome = session.await.context("Capture session task failed")?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
