//! Strategy registry
//!
//! Each [`StrategyKind`] statically declares the genes it reads, the
//! structural rule its genomes must satisfy and how a genome becomes a
//! [`StrategyConfig`] for the backtester.

use crate::engines::generation::genome::{Genome, ParamBounds, ParamRanges};
use crate::error::{EvotradeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Risk/reward genes are stored in tenths (`25` means 2.5R).
pub const RISK_REWARD_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Long-only breakout above two EMAs
    DoubleEmaBreakout,
    /// Long and short breakouts, each side with its own parameters
    #[default]
    DoubleEmaBreakoutLongShort,
}

/// Parameters of one side of a double-EMA breakout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub stop_lookback: usize,
    pub risk_reward: f64,
}

/// Concrete configuration handed to the backtester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrategyConfig {
    DoubleEmaBreakout {
        long: Option<SideParams>,
        short: Option<SideParams>,
    },
}

impl StrategyConfig {
    /// Compact identifier, e.g. `emas_9_21_stop_7_rr_2.5`
    pub fn label(&self) -> String {
        match self {
            Self::DoubleEmaBreakout { long, short } => {
                let sides: Vec<&SideParams> = long.iter().chain(short.iter()).collect();
                let emas: Vec<String> = sides
                    .iter()
                    .flat_map(|s| [s.fast_period.to_string(), s.slow_period.to_string()])
                    .collect();
                let stops: Vec<String> = sides.iter().map(|s| s.stop_lookback.to_string()).collect();
                let rrs: Vec<String> = sides.iter().map(|s| s.risk_reward.to_string()).collect();

                format!("emas_{}_stop_{}_rr_{}", emas.join("_"), stops.join("_"), rrs.join("_"))
            }
        }
    }

    /// Decoded parameter values keyed like the genes, risk/reward in R multiples
    pub fn parameters(&self) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        match self {
            Self::DoubleEmaBreakout { long, short } => {
                let dual = long.is_some() && short.is_some();
                for (suffix, side) in [("long", long), ("short", short)] {
                    let Some(side) = side else { continue };
                    let key = |base: &str| if dual { format!("{}_{}", base, suffix) } else { base.to_string() };
                    params.insert(key("ema_fast"), side.fast_period as f64);
                    params.insert(key("ema_slow"), side.slow_period as f64);
                    params.insert(key("stop"), side.stop_lookback as f64);
                    params.insert(key("rr"), side.risk_reward);
                }
            }
        }
        params
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

struct SideKeys {
    fast: &'static str,
    slow: &'static str,
    stop: &'static str,
    rr: &'static str,
}

const LONG_ONLY: SideKeys = SideKeys {
    fast: "ema_fast",
    slow: "ema_slow",
    stop: "stop",
    rr: "rr",
};

const LONG_SIDE: SideKeys = SideKeys {
    fast: "ema_fast_long",
    slow: "ema_slow_long",
    stop: "stop_long",
    rr: "rr_long",
};

const SHORT_SIDE: SideKeys = SideKeys {
    fast: "ema_fast_short",
    slow: "ema_slow_short",
    stop: "stop_short",
    rr: "rr_short",
};

impl SideKeys {
    fn all(&self) -> [&'static str; 4] {
        [self.fast, self.slow, self.stop, self.rr]
    }

    fn check_order(&self, genome: &Genome) -> std::result::Result<(), String> {
        let fast = genome.get_f64(self.fast).map_err(|e| e.to_string())?;
        let slow = genome.get_f64(self.slow).map_err(|e| e.to_string())?;
        if fast >= slow {
            return Err(format!(
                "{} ({}) must be below {} ({})",
                self.fast, fast, self.slow, slow
            ));
        }
        Ok(())
    }

    fn build(&self, genome: &Genome) -> Result<SideParams> {
        Ok(SideParams {
            fast_period: positive_period(genome, self.fast)?,
            slow_period: positive_period(genome, self.slow)?,
            stop_lookback: positive_period(genome, self.stop)?,
            risk_reward: genome.get_f64(self.rr)? / RISK_REWARD_SCALE,
        })
    }

    fn default_ranges(&self) -> [(&'static str, ParamBounds); 4] {
        [
            (self.fast, ParamBounds::int(5, 50)),
            (self.slow, ParamBounds::int(10, 200)),
            (self.stop, ParamBounds::int(5, 21)),
            (self.rr, ParamBounds::int(15, 55)),
        ]
    }
}

fn positive_period(genome: &Genome, name: &str) -> Result<usize> {
    let value = genome.get_int(name)?;
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| EvotradeError::Evaluation(format!("Gene '{}' must be a positive integer, got {}", name, value)))
}

impl StrategyKind {
    fn sides(&self) -> &'static [SideKeys] {
        match self {
            Self::DoubleEmaBreakout => &SINGLE_SIDE,
            Self::DoubleEmaBreakoutLongShort => &DUAL_SIDES,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DoubleEmaBreakout => "double_ema_breakout",
            Self::DoubleEmaBreakoutLongShort => "double_ema_breakout_long_short",
        }
    }

    /// Genes a genome must carry for this strategy
    pub fn required_keys(&self) -> Vec<&'static str> {
        self.sides().iter().flat_map(SideKeys::all).collect()
    }

    /// Reject range tables that do not cover every required gene
    pub fn check_ranges(&self, ranges: &ParamRanges) -> Result<()> {
        let missing: Vec<&str> = self
            .required_keys()
            .into_iter()
            .filter(|key| !ranges.contains_key(key))
            .collect();

        if !missing.is_empty() {
            return Err(EvotradeError::Configuration(format!(
                "Strategy '{}' requires parameter ranges for {:?}",
                self.name(),
                missing
            )));
        }
        Ok(())
    }

    /// Structural check: every fast period must be strictly below its slow period.
    pub fn validate(&self, genome: &Genome) -> std::result::Result<(), String> {
        for side in self.sides() {
            side.check_order(genome)?;
        }
        Ok(())
    }

    pub fn build_config(&self, genome: &Genome) -> Result<StrategyConfig> {
        match self {
            Self::DoubleEmaBreakout => Ok(StrategyConfig::DoubleEmaBreakout {
                long: Some(LONG_ONLY.build(genome)?),
                short: None,
            }),
            Self::DoubleEmaBreakoutLongShort => Ok(StrategyConfig::DoubleEmaBreakout {
                long: Some(LONG_SIDE.build(genome)?),
                short: Some(SHORT_SIDE.build(genome)?),
            }),
        }
    }

    /// Search space used when the configuration does not override it
    pub fn default_param_ranges(&self) -> Result<ParamRanges> {
        let entries: Vec<(&'static str, ParamBounds)> = self
            .sides()
            .iter()
            .flat_map(SideKeys::default_ranges)
            .collect();
        ParamRanges::new(entries)
    }
}

static SINGLE_SIDE: [SideKeys; 1] = [LONG_ONLY];
static DUAL_SIDES: [SideKeys; 2] = [LONG_SIDE, SHORT_SIDE];

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::genome::GeneValue;

    fn dual_genome(fast_long: i64, slow_long: i64, fast_short: i64, slow_short: i64) -> Genome {
        Genome::new()
            .with("ema_fast_long", GeneValue::Int(fast_long))
            .with("ema_slow_long", GeneValue::Int(slow_long))
            .with("stop_long", GeneValue::Int(7))
            .with("rr_long", GeneValue::Int(25))
            .with("ema_fast_short", GeneValue::Int(fast_short))
            .with("ema_slow_short", GeneValue::Int(slow_short))
            .with("stop_short", GeneValue::Int(9))
            .with("rr_short", GeneValue::Int(30))
    }

    #[test]
    fn test_validate_checks_each_side() {
        let kind = StrategyKind::DoubleEmaBreakoutLongShort;
        assert!(kind.validate(&dual_genome(9, 21, 12, 50)).is_ok());
        assert!(kind.validate(&dual_genome(21, 21, 12, 50)).is_err());
        assert!(kind.validate(&dual_genome(9, 21, 60, 50)).is_err());
    }

    #[test]
    fn test_build_config_scales_risk_reward() {
        let config = StrategyKind::DoubleEmaBreakoutLongShort
            .build_config(&dual_genome(9, 21, 12, 50))
            .unwrap();

        match config {
            StrategyConfig::DoubleEmaBreakout { long, short } => {
                let long = long.unwrap();
                let short = short.unwrap();
                assert_eq!(long.fast_period, 9);
                assert_eq!(long.stop_lookback, 7);
                assert!((long.risk_reward - 2.5).abs() < 1e-12);
                assert_eq!(short.slow_period, 50);
                assert!((short.risk_reward - 3.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_label_lists_both_sides() {
        let config = StrategyKind::DoubleEmaBreakoutLongShort
            .build_config(&dual_genome(9, 21, 12, 50))
            .unwrap();
        assert_eq!(config.label(), "emas_9_21_12_50_stop_7_9_rr_2.5_3");
    }

    #[test]
    fn test_parameters_use_gene_names() {
        let config = StrategyKind::DoubleEmaBreakoutLongShort
            .build_config(&dual_genome(9, 21, 12, 50))
            .unwrap();
        let params = config.parameters();
        assert_eq!(params.len(), 8);
        assert_eq!(params["ema_slow_short"], 50.0);
        assert_eq!(params["rr_long"], 2.5);
    }

    #[test]
    fn test_default_ranges_cover_required_keys() {
        for kind in [StrategyKind::DoubleEmaBreakout, StrategyKind::DoubleEmaBreakoutLongShort] {
            let ranges = kind.default_param_ranges().unwrap();
            assert!(kind.check_ranges(&ranges).is_ok());
            assert_eq!(ranges.len(), kind.required_keys().len());
        }
    }

    #[test]
    fn test_missing_gene_is_a_build_error() {
        let genome = Genome::new().with("ema_fast", GeneValue::Int(5));
        assert!(StrategyKind::DoubleEmaBreakout.build_config(&genome).is_err());
    }
}
