use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: Option<DateTime<Utc>>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp: None,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Trade record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub entry_bar: usize,
    pub exit_bar: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub direction: Direction,
    pub size: f64,
    pub profit: f64,
    pub return_pct: f64,
    pub exit_reason: ExitReason,
    pub fees: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    EndOfData,
}

/// Performance statistics produced by a backtest run.
///
/// Every field is finite; ratios that are undefined for a run (no trades,
/// no drawdown, flat returns) are reported as 0.0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BacktestStats {
    pub start_value: f64,
    pub end_value: f64,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub max_drawdown_duration: usize,
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub avg_winning_trade_pct: f64,
    pub avg_losing_trade_pct: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
}

impl BacktestStats {
    /// Name of the first non-finite field, if any
    pub fn first_non_finite(&self) -> Option<&'static str> {
        let fields = [
            ("start_value", self.start_value),
            ("end_value", self.end_value),
            ("total_return_pct", self.total_return_pct),
            ("max_drawdown_pct", self.max_drawdown_pct),
            ("win_rate_pct", self.win_rate_pct),
            ("avg_winning_trade_pct", self.avg_winning_trade_pct),
            ("avg_losing_trade_pct", self.avg_losing_trade_pct),
            ("best_trade_pct", self.best_trade_pct),
            ("worst_trade_pct", self.worst_trade_pct),
            ("profit_factor", self.profit_factor),
            ("sharpe_ratio", self.sharpe_ratio),
            ("sortino_ratio", self.sortino_ratio),
            ("calmar_ratio", self.calmar_ratio),
        ];

        fields
            .iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(name, _)| *name)
    }
}
