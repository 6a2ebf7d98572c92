use crate::engines::generation::genome::{Genome, Individual, ParamRanges};
use crate::engines::generation::operators;
use crate::error::{EvotradeError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fitness summary of one evaluated generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_fitness: f64,
    pub avg_fitness: f64,
    pub diversity: f64,
}

/// Fixed-size set of individuals alive in one generation
#[derive(Debug, Clone)]
pub struct Population {
    size: usize,
    param_ranges: Arc<ParamRanges>,
    individuals: Vec<Individual>,
    generation: usize,
    history: Vec<GenerationStats>,
}

impl Population {
    pub fn new(size: usize, param_ranges: Arc<ParamRanges>) -> Self {
        Self {
            size,
            param_ranges,
            individuals: Vec::with_capacity(size),
            generation: 0,
            history: Vec::new(),
        }
    }

    /// Fill the population with random individuals and reset bookkeeping
    pub fn initialize<R: Rng>(&mut self, rng: &mut R) {
        self.individuals = (0..self.size)
            .map(|_| Individual::new(operators::random_genome(&self.param_ranges, rng)))
            .collect();
        self.generation = 0;
        self.history.clear();
    }

    /// Stable sort, best first. Unevaluated individuals rank with the unfit sentinel.
    pub fn sort_by_fitness(&mut self) {
        self.individuals
            .sort_by(|a, b| b.rank_fitness().total_cmp(&a.rank_fitness()));
    }

    /// Deep copies of the top `elite_size` individuals after sorting
    pub fn get_elite(&mut self, elite_size: usize) -> Vec<Individual> {
        self.sort_by_fitness();
        self.individuals.iter().take(elite_size).cloned().collect()
    }

    /// Record best and mean fitness of the evaluated individuals.
    ///
    /// Unfit individuals take part in the mean.
    pub fn update_history(&mut self) {
        let fitnesses: Vec<f64> = self.individuals.iter().filter_map(|i| i.fitness).collect();
        if fitnesses.is_empty() {
            return;
        }

        let best_fitness = fitnesses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg_fitness = fitnesses.iter().sum::<f64>() / fitnesses.len() as f64;

        self.history.push(GenerationStats {
            generation: self.generation,
            best_fitness,
            avg_fitness,
            diversity: self.calculate_diversity(),
        });
    }

    /// Standard deviation of the finite fitness values
    pub fn calculate_diversity(&self) -> f64 {
        let values: Vec<f64> = self
            .individuals
            .iter()
            .filter_map(|i| i.fitness)
            .filter(|f| f.is_finite())
            .collect();

        if values.is_empty() {
            return 0.0;
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

        variance.sqrt()
    }

    pub fn crossover<R: Rng>(&self, parent1: &Individual, parent2: &Individual, rng: &mut R) -> Individual {
        operators::crossover(parent1, parent2, rng)
    }

    pub fn mutate<R: Rng>(&self, genome: &Genome, mutation_rate: f64, rng: &mut R) -> Genome {
        operators::mutate(genome, &self.param_ranges, mutation_rate, rng)
    }

    /// Replace the whole individual list
    pub fn replace(&mut self, individuals: Vec<Individual>) -> Result<()> {
        if individuals.len() != self.size {
            return Err(EvotradeError::Invariant(format!(
                "Population must hold {} individuals, got {}",
                self.size,
                individuals.len()
            )));
        }
        self.individuals = individuals;
        Ok(())
    }

    pub fn advance_generation(&mut self) {
        self.generation += 1;
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    pub fn param_ranges(&self) -> &Arc<ParamRanges> {
        &self.param_ranges
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }
}
