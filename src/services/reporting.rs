use crate::engines::generation::genome::Individual;
use crate::error::{EvotradeError, Result};
use crate::types::BacktestStats;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};

/// One exported optimization result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub symbol: String,
    pub timeframe: String,
    pub strategy: String,
    pub fitness: f64,
    pub params: BTreeMap<String, f64>,
    pub stats: BacktestStats,
}

impl ResultRecord {
    /// `None` for individuals without a successful backtest
    pub fn from_individual(individual: &Individual, symbol: &str, timeframe: &str) -> Option<Self> {
        let fitness = individual.fitness.filter(|f| f.is_finite())?;
        let config = individual.metadata.config.as_ref()?;
        let stats = individual.metadata.stats.clone()?;

        Some(Self {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            strategy: config.label(),
            fitness,
            params: config.parameters(),
            stats,
        })
    }
}

/// Paths written by [`ResultReporter::save`]
#[derive(Debug, Clone)]
pub struct SavedReport {
    pub json: PathBuf,
    pub csv: Option<PathBuf>,
}

pub struct ResultReporter;

impl ResultReporter {
    /// Write records sorted by total return, as JSON and optionally CSV.
    /// Files are named `<timestamp>_<strategy>_<symbol>_<timeframe>`.
    pub fn save(
        records: &[ResultRecord],
        output_dir: &Path,
        strategy_name: &str,
        write_csv: bool,
    ) -> Result<SavedReport> {
        let first = records.first().ok_or_else(|| {
            EvotradeError::Evaluation("No successful individuals to report".to_string())
        })?;

        std::fs::create_dir_all(output_dir)?;

        let mut sorted = records.to_vec();
        sorted.sort_by(|a, b| b.stats.total_return_pct.total_cmp(&a.stats.total_return_pct));

        let stem = format!(
            "{}_{}_{}_{}",
            Local::now().format("%Y-%m-%d_%H-%M"),
            strategy_name,
            first.symbol,
            first.timeframe
        );

        let json = output_dir.join(format!("{}.json", stem));
        std::fs::write(&json, serde_json::to_string_pretty(&sorted)?)?;

        let csv = if write_csv {
            let path = output_dir.join(format!("{}.csv", stem));
            let mut frame = Self::to_frame(&sorted)?;
            let mut file = File::create(&path)?;
            CsvWriter::new(&mut file).include_header(true).finish(&mut frame)?;
            Some(path)
        } else {
            None
        };

        log::info!("Saved {} results to {}", sorted.len(), json.display());
        Ok(SavedReport { json, csv })
    }

    /// One row per record: label, fitness, every parameter, then the statistics
    pub fn to_frame(records: &[ResultRecord]) -> Result<DataFrame> {
        let param_names: BTreeSet<&String> = records.iter().flat_map(|r| r.params.keys()).collect();
        let f64_column = |name: &str, value: &dyn Fn(&ResultRecord) -> f64| {
            Column::new(name.into(), records.iter().map(value).collect::<Vec<f64>>())
        };

        let mut columns = vec![
            Column::new("symbol".into(), records.iter().map(|r| r.symbol.as_str()).collect::<Vec<_>>()),
            Column::new("timeframe".into(), records.iter().map(|r| r.timeframe.as_str()).collect::<Vec<_>>()),
            Column::new("strategy".into(), records.iter().map(|r| r.strategy.as_str()).collect::<Vec<_>>()),
            f64_column("fitness", &|r| r.fitness),
        ];

        for name in param_names {
            columns.push(f64_column(name.as_str(), &|r| r.params.get(name).copied().unwrap_or(f64::NAN)));
        }

        columns.extend([
            f64_column("start_value", &|r| r.stats.start_value),
            f64_column("end_value", &|r| r.stats.end_value),
            f64_column("total_return_pct", &|r| r.stats.total_return_pct),
            f64_column("max_drawdown_pct", &|r| r.stats.max_drawdown_pct),
            f64_column("max_drawdown_duration", &|r| r.stats.max_drawdown_duration as f64),
            f64_column("trade_count", &|r| r.stats.trade_count as f64),
            f64_column("win_rate_pct", &|r| r.stats.win_rate_pct),
            f64_column("avg_winning_trade_pct", &|r| r.stats.avg_winning_trade_pct),
            f64_column("avg_losing_trade_pct", &|r| r.stats.avg_losing_trade_pct),
            f64_column("best_trade_pct", &|r| r.stats.best_trade_pct),
            f64_column("worst_trade_pct", &|r| r.stats.worst_trade_pct),
            f64_column("profit_factor", &|r| r.stats.profit_factor),
            f64_column("sharpe_ratio", &|r| r.stats.sharpe_ratio),
            f64_column("sortino_ratio", &|r| r.stats.sortino_ratio),
            f64_column("calmar_ratio", &|r| r.stats.calmar_ratio),
        ]);

        Ok(DataFrame::new(columns)?)
    }

    /// Log the best record by fitness and by total return
    pub fn log_summary(records: &[ResultRecord]) {
        let by_fitness = records.iter().max_by(|a, b| a.fitness.total_cmp(&b.fitness));
        let by_return = records
            .iter()
            .max_by(|a, b| a.stats.total_return_pct.total_cmp(&b.stats.total_return_pct));

        let (Some(by_fitness), Some(by_return)) = (by_fitness, by_return) else {
            log::warn!("Optimization produced no successful strategies");
            return;
        };

        for (title, record) in [("fitness", by_fitness), ("total return", by_return)] {
            log::info!(
                "Best by {}: {} | fitness {:.2} | return {:.2}% | max drawdown {:.2}% | win rate {:.2}% | {} trades",
                title,
                record.strategy,
                record.fitness,
                record.stats.total_return_pct,
                record.stats.max_drawdown_pct,
                record.stats.win_rate_pct,
                record.stats.trade_count
            );
        }
    }
}
