use super::traits::ConfigSection;
use crate::data::connectors::DEFAULT_MIN_ROWS;
use crate::engines::evaluation::{
    DoubleEmaBacktester, DEFAULT_FEE_RATE, DEFAULT_INITIAL_CAPITAL, DEFAULT_WARMUP_BARS,
};
use crate::engines::metrics::DEFAULT_PERIODS_PER_YEAR;
use crate::error::EvotradeError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestingConfig {
    pub initial_capital: f64,
    /// Proportional fee charged on each leg
    pub fee_rate: f64,
    pub warmup_bars: usize,
    /// Used to annualize Sharpe and Sortino
    pub periods_per_year: f64,
    pub min_rows: usize,
}

impl Default for BacktestingConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            fee_rate: DEFAULT_FEE_RATE,
            warmup_bars: DEFAULT_WARMUP_BARS,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            min_rows: DEFAULT_MIN_ROWS,
        }
    }
}

impl BacktestingConfig {
    pub fn to_backtester(&self) -> DoubleEmaBacktester {
        DoubleEmaBacktester::new(self.initial_capital, self.fee_rate, self.warmup_bars)
            .with_periods_per_year(self.periods_per_year)
    }
}

impl ConfigSection for BacktestingConfig {
    fn section_name() -> &'static str {
        "backtesting"
    }

    fn validate(&self) -> Result<(), EvotradeError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(EvotradeError::Configuration(
                "Initial capital must be positive".to_string()
            ));
        }
        if !(0.0..1.0).contains(&self.fee_rate) {
            return Err(EvotradeError::Configuration(
                "Fee rate must be within [0, 1)".to_string()
            ));
        }
        if !(self.periods_per_year.is_finite() && self.periods_per_year >= 1.0) {
            return Err(EvotradeError::Configuration(
                "Periods per year must be at least 1".to_string()
            ));
        }
        Ok(())
    }
}
