//! Genome representation for parameter search
//!
//! A genome maps every parameter name of a [`ParamRanges`] table to a concrete
//! value. Both tables are kept in `BTreeMap`s: iteration order is part of the
//! reproducibility contract, since random draws are made key by key.
//!
//! # Example
//!
//! ```
//! use evotrade::engines::generation::genome::{ParamBounds, ParamRanges};
//!
//! let ranges = ParamRanges::new([
//!     ("ema_fast_long", ParamBounds::int(5, 50)),
//!     ("ema_slow_long", ParamBounds::int(10, 200)),
//! ])
//! .unwrap();
//! assert_eq!(ranges.len(), 2);
//! ```

use crate::engines::generation::strategy::StrategyConfig;
use crate::error::{EvotradeError, Result};
use crate::types::BacktestStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fitness assigned to structurally invalid or failed candidates.
pub const UNFIT: f64 = f64::NEG_INFINITY;

/// Inclusive bounds of a single gene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamBounds {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

impl ParamBounds {
    pub fn int(min: i64, max: i64) -> Self {
        Self::Int { min, max }
    }

    pub fn float(min: f64, max: f64) -> Self {
        Self::Float { min, max }
    }

    pub fn contains(&self, value: &GeneValue) -> bool {
        match (self, value) {
            (Self::Int { min, max }, GeneValue::Int(v)) => min <= v && v <= max,
            (Self::Float { min, max }, GeneValue::Float(v)) => *min <= *v && *v <= *max,
            _ => false,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        match *self {
            Self::Int { min, max } if min > max => Err(EvotradeError::Configuration(format!(
                "Parameter '{}' has min {} greater than max {}",
                name, min, max
            ))),
            Self::Float { min, max } if !min.is_finite() || !max.is_finite() => {
                Err(EvotradeError::Configuration(format!(
                    "Parameter '{}' has non-finite bounds ({}, {})",
                    name, min, max
                )))
            }
            Self::Float { min, max } if min > max => Err(EvotradeError::Configuration(format!(
                "Parameter '{}' has min {} greater than max {}",
                name, min, max
            ))),
            _ => Ok(()),
        }
    }
}

/// Legal bounds per gene, shared read-only by the whole population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, ParamBounds>", into = "BTreeMap<String, ParamBounds>")]
pub struct ParamRanges {
    ranges: BTreeMap<String, ParamBounds>,
}

impl ParamRanges {
    pub fn new<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, ParamBounds)>,
        K: Into<String>,
    {
        let ranges: BTreeMap<String, ParamBounds> = entries
            .into_iter()
            .map(|(name, bounds)| (name.into(), bounds))
            .collect();

        if ranges.is_empty() {
            return Err(EvotradeError::Configuration(
                "Parameter range table must not be empty".to_string(),
            ));
        }

        for (name, bounds) in &ranges {
            bounds.validate(name)?;
        }

        Ok(Self { ranges })
    }

    pub fn get(&self, name: &str) -> Option<&ParamBounds> {
        self.ranges.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.ranges.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamBounds)> {
        self.ranges.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.ranges.keys()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl TryFrom<BTreeMap<String, ParamBounds>> for ParamRanges {
    type Error = EvotradeError;

    fn try_from(ranges: BTreeMap<String, ParamBounds>) -> Result<Self> {
        Self::new(ranges)
    }
}

impl From<ParamRanges> for BTreeMap<String, ParamBounds> {
    fn from(ranges: ParamRanges) -> Self {
        ranges.ranges
    }
}

/// Concrete value of a gene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeneValue {
    Int(i64),
    Float(f64),
}

impl GeneValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl fmt::Display for GeneValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Parameter vector being optimized
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome {
    genes: BTreeMap<String, GeneValue>,
}

impl Genome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: GeneValue) {
        self.genes.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: GeneValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&GeneValue> {
        self.genes.get(name)
    }

    /// Integer gene lookup; float genes are rejected rather than truncated.
    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.genes.get(name) {
            Some(GeneValue::Int(v)) => Ok(*v),
            Some(GeneValue::Float(v)) => Err(EvotradeError::Evaluation(format!(
                "Gene '{}' must be an integer, found {}",
                name, v
            ))),
            None => Err(EvotradeError::Evaluation(format!("Gene '{}' is missing", name))),
        }
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        self.genes
            .get(name)
            .map(GeneValue::as_f64)
            .ok_or_else(|| EvotradeError::Evaluation(format!("Gene '{}' is missing", name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GeneValue)> {
        self.genes.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.genes.keys()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.genes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "}}")
    }
}

/// How the last evaluation of an individual ended
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum EvaluationOutcome {
    #[default]
    Pending,
    Evaluated,
    /// Rejected by the structural pre-filter; the backtester was never called.
    Invalid { reason: String },
    /// Configuration building or the backtest itself failed.
    Failed { reason: String },
}

/// Diagnostic payload attached at evaluation time
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationMetadata {
    pub outcome: EvaluationOutcome,
    pub stats: Option<BacktestStats>,
    pub config: Option<StrategyConfig>,
}

/// A genome plus its evaluated fitness and metadata.
///
/// `Clone` is a deep copy; it is what elite preservation relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub genome: Genome,
    pub fitness: Option<f64>,
    pub metadata: EvaluationMetadata,
}

impl Individual {
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            fitness: None,
            metadata: EvaluationMetadata::default(),
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Fitness used for ordering; unevaluated individuals rank as unfit.
    pub fn rank_fitness(&self) -> f64 {
        self.fitness.unwrap_or(UNFIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_ranges_rejects_inverted_bounds() {
        let result = ParamRanges::new([("a", ParamBounds::int(5, 1))]);
        assert!(matches!(result, Err(EvotradeError::Configuration(_))));
    }

    #[test]
    fn test_param_ranges_rejects_empty_table() {
        let result = ParamRanges::new(Vec::<(String, ParamBounds)>::new());
        assert!(matches!(result, Err(EvotradeError::Configuration(_))));
    }

    #[test]
    fn test_unevaluated_ranks_as_unfit() {
        let individual = Individual::new(Genome::new().with("a", GeneValue::Int(1)));
        assert!(!individual.is_evaluated());
        assert_eq!(individual.rank_fitness(), UNFIT);
        assert!(UNFIT < -f64::MAX);
    }

    #[test]
    fn test_get_int_rejects_float_gene() {
        let genome = Genome::new().with("rr", GeneValue::Float(1.5));
        assert!(genome.get_int("rr").is_err());
        assert_eq!(genome.get_f64("rr").unwrap(), 1.5);
    }

    #[test]
    fn test_param_ranges_from_toml() {
        let ranges: ParamRanges = toml::from_str(
            r#"
            ema_fast = { min = 5, max = 50 }
            rr = { min = 1.5, max = 5.5 }
            "#,
        )
        .unwrap();

        assert_eq!(ranges.get("ema_fast"), Some(&ParamBounds::int(5, 50)));
        assert_eq!(ranges.get("rr"), Some(&ParamBounds::float(1.5, 5.5)));
    }
}
