// src/engines/metrics/profitability.rs
use crate::types::*;

/// Trade-level statistics. Percentages are per-trade returns on committed capital.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfitabilityMetrics {
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub avg_winning_trade_pct: f64,
    pub avg_losing_trade_pct: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub profit_factor: f64,
}

impl ProfitabilityMetrics {
    pub fn calculate(trades: &[Trade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }

        let winning_trades: Vec<&Trade> = trades.iter().filter(|t| t.profit > 0.0).collect();
        let losing_trades: Vec<&Trade> = trades.iter().filter(|t| t.profit < 0.0).collect();

        let mean_return = |group: &[&Trade]| {
            if group.is_empty() {
                0.0
            } else {
                group.iter().map(|t| t.return_pct).sum::<f64>() / group.len() as f64
            }
        };

        let gross_profit: f64 = winning_trades.iter().map(|t| t.profit).sum();
        let gross_loss: f64 = losing_trades.iter().map(|t| t.profit.abs()).sum();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            0.0
        };

        let returns = trades.iter().map(|t| t.return_pct);

        Self {
            trade_count: trades.len(),
            win_rate_pct: winning_trades.len() as f64 / trades.len() as f64 * 100.0,
            avg_winning_trade_pct: mean_return(&winning_trades),
            avg_losing_trade_pct: mean_return(&losing_trades),
            best_trade_pct: returns.clone().fold(f64::NEG_INFINITY, f64::max),
            worst_trade_pct: returns.fold(f64::INFINITY, f64::min),
            profit_factor,
        }
    }
}
