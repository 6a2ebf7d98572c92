// src/engines/metrics/engine.rs
use crate::types::*;
use crate::engines::metrics::{ProfitabilityMetrics, RiskMetrics};

/// 15-minute bars over a 365-day year
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 35_040.0;

pub struct MetricsEngine {
    initial_capital: f64,
    periods_per_year: f64,
}

impl MetricsEngine {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }

    pub fn with_periods_per_year(mut self, periods_per_year: f64) -> Self {
        self.periods_per_year = periods_per_year;
        self
    }

    /// Summarize a finished run. `equity_curve` holds one end-of-bar value per bar.
    pub fn calculate(&self, trades: &[Trade], equity_curve: &[f64]) -> BacktestStats {
        let profit = ProfitabilityMetrics::calculate(trades);
        let risk = RiskMetrics::calculate(equity_curve, self.initial_capital, self.periods_per_year);

        let end_value = equity_curve.last().copied().unwrap_or(self.initial_capital);
        let total_return_pct = if self.initial_capital > 0.0 {
            (end_value - self.initial_capital) / self.initial_capital * 100.0
        } else {
            0.0
        };
        let calmar_ratio = if risk.max_drawdown_pct > 0.0 {
            total_return_pct / risk.max_drawdown_pct
        } else {
            0.0
        };

        BacktestStats {
            start_value: self.initial_capital,
            end_value,
            total_return_pct,
            max_drawdown_pct: risk.max_drawdown_pct,
            max_drawdown_duration: risk.max_drawdown_duration,
            trade_count: profit.trade_count,
            win_rate_pct: profit.win_rate_pct,
            avg_winning_trade_pct: profit.avg_winning_trade_pct,
            avg_losing_trade_pct: profit.avg_losing_trade_pct,
            best_trade_pct: profit.best_trade_pct,
            worst_trade_pct: profit.worst_trade_pct,
            profit_factor: profit.profit_factor,
            sharpe_ratio: risk.sharpe_ratio,
            sortino_ratio: risk.sortino_ratio,
            calmar_ratio,
        }
    }
}
