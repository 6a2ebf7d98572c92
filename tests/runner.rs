use evotrade::config::AppConfig;
use evotrade::data::{CsvConnector, PriceSeries};
use evotrade::engines::generation::{CancellationToken, SilentProgress};
use evotrade::services::{run_search, EvolutionRunner, ResultRecord, ResultReporter};
use polars::prelude::*;
use std::fmt::Write as _;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

/// Oscillating market with a slight upward drift
fn csv_text(bars: usize) -> String {
    let mut text = String::from("timestamp,open,high,low,close,volume\n");
    let mut prev_close = 100.0_f64;
    for i in 0..bars {
        let close = 100.0 + 10.0 * (i as f64 / 15.0).sin() + 0.01 * i as f64;
        let open = prev_close;
        let high = open.max(close) + 0.5;
        let low = open.min(close) - 0.5;
        writeln!(text, "{},{},{},{},{},{}", i, open, high, low, close, 1000.0).unwrap();
        prev_close = close;
    }
    text
}

fn load_prices(dir: &std::path::Path) -> Arc<PriceSeries> {
    let path = dir.join("prices.csv");
    std::fs::write(&path, csv_text(400)).unwrap();
    Arc::new(CsvConnector::load_prices(&path, None).unwrap())
}

fn small_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.evolution.population_size = 12;
    config.evolution.generations = 3;
    config.evolution.elite_size = 3;
    config.evolution.seed = Some(1);
    config.evolution.threads = Some(2);
    config.backtesting.warmup_bars = 20;
    config
}

#[test]
fn test_search_produces_reportable_results() {
    let dir = tempdir().unwrap();
    let prices = load_prices(dir.path());
    let config = small_config();

    let outcome = run_search(prices, &config, &mut SilentProgress, &CancellationToken::new()).unwrap();

    assert_eq!(outcome.history.len(), 3);
    assert!(!outcome.best.is_empty());
    assert!(!outcome.records.is_empty());
    for record in &outcome.records {
        assert_eq!(record.symbol, "BTCUSDT");
        assert_eq!(record.params.len(), 8);
        assert!(record.fitness.is_finite());
    }

    let saved = ResultReporter::save(
        &outcome.records,
        &dir.path().join("results"),
        config.strategy.kind.name(),
        true,
    )
    .unwrap();

    let json = std::fs::read_to_string(&saved.json).unwrap();
    let parsed: Vec<ResultRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), outcome.records.len());
    for pair in parsed.windows(2) {
        assert!(pair[0].stats.total_return_pct >= pair[1].stats.total_return_pct);
    }

    let csv_path = saved.csv.unwrap();
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(csv_path))
        .unwrap()
        .finish()
        .unwrap();
    assert_eq!(frame.height(), outcome.records.len());
    assert!(frame.column("ema_fast_long").is_ok());
    assert!(frame.column("calmar_ratio").is_ok());
}

#[test]
fn test_reporter_rejects_empty_results() {
    let dir = tempdir().unwrap();
    assert!(ResultReporter::save(&[], dir.path(), "double_ema_breakout", false).is_err());
}

#[test]
fn test_runner_streams_progress_until_finished() {
    let dir = tempdir().unwrap();
    let prices = load_prices(dir.path());

    let mut runner = EvolutionRunner::start(prices, small_config()).unwrap();
    let mut updates = Vec::new();

    let result = loop {
        while let Some(update) = runner.poll_progress() {
            updates.push(update);
        }
        if let Some(result) = runner.try_get_results() {
            break result;
        }
        thread::sleep(Duration::from_millis(10));
    };
    while let Some(update) = runner.poll_progress() {
        updates.push(update);
    }

    let outcome = result.unwrap();
    assert_eq!(outcome.history.len(), 3);
    assert!(!runner.is_running());

    let (finished, progress): (Vec<_>, Vec<_>) = updates.into_iter().partition(|u| u.finished);
    assert_eq!(finished.len(), 1);
    assert_eq!(progress.iter().map(|u| u.generation).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(progress.iter().all(|u| u.total_generations == 3));
}

#[test]
fn test_invalid_configuration_surfaces_as_error() {
    let dir = tempdir().unwrap();
    let prices = load_prices(dir.path());
    let mut config = small_config();
    config.evolution.elite_size = 50;

    let runner = EvolutionRunner::start(prices, config).unwrap();
    assert!(runner.wait().is_err());
}
