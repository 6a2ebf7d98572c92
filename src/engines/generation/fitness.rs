use crate::types::BacktestStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Built-in scoring rules selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    /// `total_return_pct * (1 - max_drawdown_pct / 100)`
    #[default]
    ReturnDrawdown,
    /// `sharpe_ratio * (1 - max_drawdown_pct / 200)`
    SharpeDrawdown,
    TotalReturn,
}

impl FitnessMetric {
    pub fn score(&self, stats: &BacktestStats) -> f64 {
        match self {
            Self::ReturnDrawdown => stats.total_return_pct * (1.0 - stats.max_drawdown_pct / 100.0),
            Self::SharpeDrawdown => stats.sharpe_ratio * (1.0 - stats.max_drawdown_pct / 200.0),
            Self::TotalReturn => stats.total_return_pct,
        }
    }
}

/// Pure mapping from a statistics record to a scalar fitness
#[derive(Clone)]
pub struct FitnessFunction {
    name: String,
    score: Arc<dyn Fn(&BacktestStats) -> f64 + Send + Sync>,
}

impl FitnessFunction {
    pub fn custom<F>(name: impl Into<String>, score: F) -> Self
    where
        F: Fn(&BacktestStats) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            score: Arc::new(score),
        }
    }

    pub fn evaluate(&self, stats: &BacktestStats) -> f64 {
        (self.score)(stats)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<FitnessMetric> for FitnessFunction {
    fn from(metric: FitnessMetric) -> Self {
        Self::custom(format!("{:?}", metric), move |stats| metric.score(stats))
    }
}

impl Default for FitnessFunction {
    fn default() -> Self {
        FitnessMetric::default().into()
    }
}

impl fmt::Debug for FitnessFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitnessFunction").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_drawdown_score() {
        let stats = BacktestStats {
            total_return_pct: 40.0,
            max_drawdown_pct: 25.0,
            ..Default::default()
        };
        let fitness = FitnessFunction::from(FitnessMetric::ReturnDrawdown);
        assert!((fitness.evaluate(&stats) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_sharpe_drawdown_score() {
        let stats = BacktestStats {
            sharpe_ratio: 2.0,
            max_drawdown_pct: 50.0,
            ..Default::default()
        };
        assert!((FitnessMetric::SharpeDrawdown.score(&stats) - 1.5).abs() < 1e-12);
    }
}
