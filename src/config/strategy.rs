use super::traits::ConfigSection;
use crate::engines::generation::fitness::FitnessMetric;
use crate::engines::generation::genome::ParamRanges;
use crate::engines::generation::strategy::StrategyKind;
use crate::error::{EvotradeError, Result};
use serde::{Deserialize, Serialize};

/// What is searched and how candidates are scored
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub kind: StrategyKind,
    pub symbol: String,
    pub timeframe: String,
    pub fitness: FitnessMetric,
    /// Replaces the strategy's default search space when present
    pub param_ranges: Option<ParamRanges>,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            kind: StrategyKind::default(),
            symbol: "BTCUSDT".to_string(),
            timeframe: "15m".to_string(),
            fitness: FitnessMetric::default(),
            param_ranges: None,
        }
    }
}

impl StrategySettings {
    pub fn resolved_param_ranges(&self) -> Result<ParamRanges> {
        match &self.param_ranges {
            Some(ranges) => Ok(ranges.clone()),
            None => self.kind.default_param_ranges(),
        }
    }
}

impl ConfigSection for StrategySettings {
    fn section_name() -> &'static str {
        "strategy"
    }

    fn validate(&self) -> std::result::Result<(), EvotradeError> {
        if self.symbol.trim().is_empty() {
            return Err(EvotradeError::Configuration("Symbol must not be empty".to_string()));
        }
        let ranges = self.resolved_param_ranges()?;
        self.kind.check_ranges(&ranges)
    }
}
