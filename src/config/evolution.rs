use super::traits::ConfigSection;
use crate::engines::generation::evolution_engine::{EliteDedup, EvolverConfig};
use crate::error::EvotradeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named population/generations/elite combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationPreset {
    Quick,
    Intense,
    Robust,
    Extensive,
}

impl OptimizationPreset {
    /// `(population_size, generations, elite_size)`
    pub fn parameters(&self) -> (usize, usize, usize) {
        match self {
            Self::Quick => (500, 15, 25),
            Self::Intense => (1000, 40, 50),
            Self::Robust => (2500, 40, 125),
            Self::Extensive => (5000, 50, 250),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Intense => "intense",
            Self::Robust => "robust",
            Self::Extensive => "extensive",
        }
    }
}

impl fmt::Display for OptimizationPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationPreset {
    type Err = EvotradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "intense" => Ok(Self::Intense),
            "robust" => Ok(Self::Robust),
            "extensive" => Ok(Self::Extensive),
            other => Err(EvotradeError::Configuration(format!(
                "Unknown preset '{}', expected quick, intense, robust or extensive",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// When set, overrides population size, generations and elite size
    pub preset: Option<OptimizationPreset>,
    pub population_size: usize,
    pub generations: usize,
    pub elite_size: usize,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    pub stagnation_limit: usize,
    pub max_breeding_attempts_per_child: usize,
    pub elite_dedup: EliteDedup,
    pub seed: Option<u64>,
    pub threads: Option<usize>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        let engine = EvolverConfig::default();
        Self {
            preset: None,
            population_size: engine.population_size,
            generations: engine.generations,
            elite_size: engine.elite_size,
            mutation_rate: engine.mutation_rate,
            tournament_size: engine.tournament_size,
            stagnation_limit: engine.stagnation_limit,
            max_breeding_attempts_per_child: engine.max_breeding_attempts_per_child,
            elite_dedup: engine.elite_dedup,
            seed: engine.seed,
            threads: engine.threads,
        }
    }
}

impl EvolutionConfig {
    /// Engine settings with the preset, if any, applied
    pub fn to_evolver_config(&self, symbol: &str, timeframe: &str) -> EvolverConfig {
        let (population_size, generations, elite_size) = match self.preset {
            Some(preset) => preset.parameters(),
            None => (self.population_size, self.generations, self.elite_size),
        };

        EvolverConfig {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            population_size,
            generations,
            elite_size,
            mutation_rate: self.mutation_rate,
            tournament_size: self.tournament_size,
            stagnation_limit: self.stagnation_limit,
            max_breeding_attempts_per_child: self.max_breeding_attempts_per_child,
            elite_dedup: self.elite_dedup,
            seed: self.seed,
            threads: self.threads,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), EvotradeError> {
        self.to_evolver_config("", "").validate()
    }
}
