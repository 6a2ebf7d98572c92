pub mod backtester;
pub mod portfolio;

pub use backtester::{BacktestReport, DoubleEmaBacktester, DEFAULT_WARMUP_BARS};
pub use portfolio::{Portfolio, Position, DEFAULT_FEE_RATE, DEFAULT_INITIAL_CAPITAL};

use crate::data::PriceSeries;
use crate::engines::generation::strategy::StrategyConfig;
use crate::error::Result;
use crate::types::BacktestStats;

/// Runs one strategy configuration over a price series.
///
/// Implementations are shared across evaluation threads and must not keep
/// per-run state behind `&self`. Errors and panics are contained per
/// individual by the fitness evaluator.
pub trait BacktestEvaluator: Send + Sync {
    fn run(&self, config: &StrategyConfig, prices: &PriceSeries) -> Result<BacktestStats>;
}
