// src/engines/metrics/risk.rs

/// Equity-curve statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskMetrics {
    pub max_drawdown_pct: f64,
    /// Longest stretch, in bars, spent below a previous peak
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
}

impl RiskMetrics {
    /// `start_value` seeds the running peak; ratios are annualized with
    /// `sqrt(periods_per_year)` and reported as 0.0 when undefined.
    pub fn calculate(equity_curve: &[f64], start_value: f64, periods_per_year: f64) -> Self {
        if equity_curve.is_empty() {
            return Self::default();
        }

        let (max_drawdown_pct, max_drawdown_duration) = Self::max_drawdown(equity_curve, start_value);

        let returns = Self::calculate_returns(equity_curve, start_value);
        let avg_return = returns.iter().sum::<f64>() / returns.len() as f64;
        let annualization = periods_per_year.max(1.0).sqrt();

        let volatility = Self::std_dev(&returns);
        let sharpe_ratio = if volatility > 0.0 {
            avg_return / volatility * annualization
        } else {
            0.0
        };

        // Downside deviation over all periods, positive returns counted as zero
        let downside_dev = (returns.iter().map(|r| r.min(0.0).powi(2)).sum::<f64>()
            / returns.len() as f64)
            .sqrt();
        let sortino_ratio = if downside_dev > 0.0 {
            avg_return / downside_dev * annualization
        } else {
            0.0
        };

        Self {
            max_drawdown_pct,
            max_drawdown_duration,
            sharpe_ratio,
            sortino_ratio,
        }
    }

    fn max_drawdown(equity: &[f64], start_value: f64) -> (f64, usize) {
        let mut max_dd: f64 = 0.0;
        let mut peak = start_value;
        let mut bars_below_peak = 0;
        let mut max_duration = 0;

        for &value in equity {
            if value >= peak {
                peak = value;
                bars_below_peak = 0;
                continue;
            }

            bars_below_peak += 1;
            max_duration = max_duration.max(bars_below_peak);
            if peak > 0.0 {
                max_dd = max_dd.max((peak - value) / peak * 100.0);
            }
        }

        (max_dd, max_duration)
    }

    fn calculate_returns(equity: &[f64], start_value: f64) -> Vec<f64> {
        std::iter::once(start_value)
            .chain(equity.iter().copied())
            .collect::<Vec<f64>>()
            .windows(2)
            .map(|w| if w[0].abs() > f64::EPSILON { (w[1] - w[0]) / w[0] } else { 0.0 })
            .collect()
    }

    fn std_dev(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance = values.iter()
            .map(|&v| (v - mean).powi(2))
            .sum::<f64>() / values.len() as f64;

        variance.sqrt()
    }
}
