use anyhow::{Context, Result};
use clap::Parser;
use evotrade::config::{ConfigManager, OptimizationPreset};
use evotrade::data::CsvConnector;
use evotrade::engines::generation::{CancellationToken, ConsoleProgressCallback};
use evotrade::services::{run_search, ResultReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Evolve trading-strategy parameters against historical OHLCV data
#[derive(Debug, Parser)]
#[command(name = "evotrade", version, about)]
struct Cli {
    /// TOML configuration file; `EVOTRADE__SECTION__KEY` variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV file with open, high, low, close and optional volume columns
    #[arg(short, long)]
    data: PathBuf,

    /// Directory for the JSON and CSV results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// quick, intense, robust or extensive
    #[arg(long)]
    preset: Option<OptimizationPreset>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let manager = ConfigManager::new();
    manager
        .load_layered(cli.config.as_deref())
        .context("Failed to load configuration")?;
    manager
        .update(|config| {
            if let Some(seed) = cli.seed {
                config.evolution.seed = Some(seed);
            }
            if let Some(preset) = cli.preset {
                config.evolution.preset = Some(preset);
            }
            if let Some(output) = &cli.output {
                config.reporting.output_dir = output.clone();
            }
        })
        .context("Invalid command-line overrides")?;
    let config = manager.get();

    let prices = CsvConnector::load_prices(&cli.data, Some(config.backtesting.min_rows))
        .with_context(|| format!("Failed to load price data from {}", cli.data.display()))?;

    let outcome = run_search(
        Arc::new(prices),
        &config,
        &mut ConsoleProgressCallback,
        &CancellationToken::new(),
    )
    .context("Evolution failed")?;

    ResultReporter::log_summary(&outcome.records);
    if outcome.records.is_empty() {
        log::warn!("No strategy completed a backtest; nothing to save");
        return Ok(());
    }

    let saved = ResultReporter::save(
        &outcome.records,
        &config.reporting.output_dir,
        config.strategy.kind.name(),
        config.reporting.write_csv,
    )
    .context("Failed to save results")?;

    println!("Results saved to {}", saved.json.display());
    if let Some(csv) = saved.csv {
        println!("CSV written to {}", csv.display());
    }

    Ok(())
}
