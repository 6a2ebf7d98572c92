use crate::engines::evaluation::BacktestEvaluator;
use crate::engines::generation::{
    evaluator::FitnessEvaluator,
    genome::{Individual, ParamRanges, UNFIT},
    operators::tournament_selection,
    population::{GenerationStats, Population},
};
use crate::error::{EvotradeError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How duplicate candidates are removed from the elite set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliteDedup {
    /// Drop an elite whose genome equals one already selected
    #[default]
    Genome,
    /// Drop an elite whose fitness equals one already selected
    Fitness,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolverConfig {
    pub symbol: String,
    pub timeframe: String,
    pub population_size: usize,
    pub generations: usize,
    pub elite_size: usize,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    /// Generations without improvement before stopping; 0 disables early stopping
    pub stagnation_limit: usize,
    pub max_breeding_attempts_per_child: usize,
    pub elite_dedup: EliteDedup,
    pub seed: Option<u64>,
    pub threads: Option<usize>,
}

impl Default for EvolverConfig {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            timeframe: String::new(),
            population_size: 500,
            generations: 15,
            elite_size: 25,
            mutation_rate: 0.3,
            tournament_size: 3,
            stagnation_limit: 10,
            max_breeding_attempts_per_child: 100,
            elite_dedup: EliteDedup::Genome,
            seed: None,
            threads: None,
        }
    }
}

impl EvolverConfig {
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(EvotradeError::Configuration(msg)) };

        if self.population_size == 0 {
            return fail("Population size must be greater than 0".to_string());
        }
        if self.generations == 0 {
            return fail("Number of generations must be greater than 0".to_string());
        }
        if self.elite_size == 0 {
            return fail("Elite size must be greater than 0".to_string());
        }
        if self.elite_size > self.population_size {
            return fail(format!(
                "Elite size ({}) cannot exceed population size ({})",
                self.elite_size, self.population_size
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return fail(format!("Mutation rate must be within [0, 1], got {}", self.mutation_rate));
        }
        if self.tournament_size == 0 {
            return fail("Tournament size must be at least 1".to_string());
        }
        if self.max_breeding_attempts_per_child == 0 {
            return fail("Breeding attempts per child must be at least 1".to_string());
        }
        if self.threads == Some(0) {
            return fail("Thread count must be at least 1 when set".to_string());
        }
        Ok(())
    }
}

/// Where the generational loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvolutionPhase {
    Init,
    Evaluating,
    Selecting,
    Breeding,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    GenerationLimit,
    Stagnation,
    Cancelled,
}

/// Cooperative cancellation flag, honored between generations
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Snapshot sent to the progress callback after each generation's selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: usize,
    pub total_generations: usize,
    pub population_size: usize,
    pub evaluated: usize,
    pub stats: GenerationStats,
    pub best_fitness_ever: f64,
    pub stagnant_generations: usize,
    pub elite_count: usize,
    pub best: Option<Individual>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSummary {
    pub generations_run: usize,
    pub stop_reason: StopReason,
    pub best_fitness: f64,
}

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, _generation: usize, _population_size: usize) {}
    fn on_generation_complete(&mut self, report: &GenerationReport);
    fn on_evolution_complete(&mut self, _summary: &EvolutionSummary) {}
}

/// Generational genetic search over strategy parameters
pub struct Evolver<B: BacktestEvaluator> {
    config: EvolverConfig,
    evaluator: FitnessEvaluator<B>,
    population: Population,
    pool: rayon::ThreadPool,
    rng: StdRng,
    phase: EvolutionPhase,
    best_fitness_ever: f64,
    stagnant_generations: usize,
    best_individuals: Vec<Individual>,
}

impl<B: BacktestEvaluator> Evolver<B> {
    pub fn new(
        config: EvolverConfig,
        param_ranges: ParamRanges,
        evaluator: FitnessEvaluator<B>,
    ) -> Result<Self> {
        config.validate()?;
        evaluator.check_ranges(&param_ranges)?;

        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("evotrade-eval-{}", i));
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build().map_err(|e| {
            EvotradeError::Configuration(format!("Failed to build evaluation thread pool: {}", e))
        })?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let population = Population::new(config.population_size, Arc::new(param_ranges));

        Ok(Self {
            config,
            evaluator,
            population,
            pool,
            rng,
            phase: EvolutionPhase::Init,
            best_fitness_ever: UNFIT,
            stagnant_generations: 0,
            best_individuals: Vec::new(),
        })
    }

    pub fn evolve(&mut self) -> Result<Vec<Individual>> {
        self.evolve_with(&mut SilentProgress, &CancellationToken::new())
    }

    /// Run to completion and return the final elites, best first
    pub fn evolve_with<C: ProgressCallback + ?Sized>(
        &mut self,
        callback: &mut C,
        cancel: &CancellationToken,
    ) -> Result<Vec<Individual>> {
        self.phase = EvolutionPhase::Init;
        self.population.initialize(&mut self.rng);
        self.best_fitness_ever = UNFIT;
        self.stagnant_generations = 0;
        self.best_individuals.clear();

        log::info!(
            "Evolving {} on {} {}: population {}, generations {}, elite {}",
            self.evaluator.strategy(),
            self.config.symbol,
            self.config.timeframe,
            self.config.population_size,
            self.config.generations,
            self.config.elite_size
        );

        let stop_reason = loop {
            let generation = self.population.generation();
            callback.on_generation_start(generation, self.population.len());

            self.phase = EvolutionPhase::Evaluating;
            let evaluated = self.evaluate_population();
            log::debug!("Generation {}: evaluated {} new individuals", generation, evaluated);

            self.phase = EvolutionPhase::Selecting;
            self.best_individuals = self.select_elites();
            self.population.update_history();
            self.track_stagnation();

            let report = self.report(generation, evaluated);
            log::info!(
                "Generation {}/{}: best {:.4}, avg {:.4}, diversity {:.4}, stagnant {}",
                generation + 1,
                self.config.generations,
                report.stats.best_fitness,
                report.stats.avg_fitness,
                report.stats.diversity,
                self.stagnant_generations
            );
            callback.on_generation_complete(&report);

            if self.config.stagnation_limit > 0 && self.stagnant_generations >= self.config.stagnation_limit {
                log::info!("No improvement in {} generations, stopping", self.stagnant_generations);
                break StopReason::Stagnation;
            }
            if generation + 1 >= self.config.generations {
                break StopReason::GenerationLimit;
            }
            if cancel.is_cancelled() {
                log::info!("Evolution cancelled after generation {}", generation);
                break StopReason::Cancelled;
            }

            self.phase = EvolutionPhase::Breeding;
            let next = self.breed_next_generation()?;
            self.population.replace(next)?;
            self.population.advance_generation();
        };

        self.phase = EvolutionPhase::Done;
        let summary = EvolutionSummary {
            generations_run: self.population.generation() + 1,
            stop_reason,
            best_fitness: self.best_fitness_ever,
        };
        callback.on_evolution_complete(&summary);

        Ok(self.best_individuals.clone())
    }

    /// Evaluate every individual without a fitness on the worker pool
    fn evaluate_population(&mut self) -> usize {
        let evaluator = &self.evaluator;
        let individuals = self.population.individuals_mut();

        self.pool.install(|| {
            individuals
                .par_iter_mut()
                .filter(|individual| !individual.is_evaluated())
                .map(|individual| evaluator.evaluate_individual(individual))
                .filter(|evaluated| *evaluated)
                .count()
        })
    }

    /// Top `elite_size` after sorting, minus duplicates
    fn select_elites(&mut self) -> Vec<Individual> {
        let candidates = self.population.get_elite(self.config.elite_size);
        let mut elites: Vec<Individual> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let duplicate = match self.config.elite_dedup {
                EliteDedup::Genome => elites.iter().any(|e| e.genome == candidate.genome),
                EliteDedup::Fitness => elites
                    .iter()
                    .any(|e| e.rank_fitness().total_cmp(&candidate.rank_fitness()).is_eq()),
                EliteDedup::None => false,
            };
            if !duplicate {
                elites.push(candidate);
            }
        }

        elites
    }

    fn track_stagnation(&mut self) {
        let generation_best = self
            .best_individuals
            .first()
            .map(Individual::rank_fitness)
            .unwrap_or(UNFIT);

        if generation_best > self.best_fitness_ever {
            self.best_fitness_ever = generation_best;
            self.stagnant_generations = 0;
        } else {
            self.stagnant_generations += 1;
        }
    }

    fn report(&self, generation: usize, evaluated: usize) -> GenerationReport {
        let stats = self.population.history().last().copied().unwrap_or(GenerationStats {
            generation,
            best_fitness: UNFIT,
            avg_fitness: UNFIT,
            diversity: 0.0,
        });

        GenerationReport {
            generation,
            total_generations: self.config.generations,
            population_size: self.population.len(),
            evaluated,
            stats,
            best_fitness_ever: self.best_fitness_ever,
            stagnant_generations: self.stagnant_generations,
            elite_count: self.best_individuals.len(),
            best: self.best_individuals.first().cloned(),
        }
    }

    /// Elites first, then tournament-bred children that pass the structural check
    fn breed_next_generation(&mut self) -> Result<Vec<Individual>> {
        let size = self.config.population_size;
        let mut next = self.best_individuals.clone();
        let open_slots = size.saturating_sub(next.len());
        let max_attempts = self.config.max_breeding_attempts_per_child.saturating_mul(open_slots);

        let parents = self.population.individuals();
        let mut attempts = 0;

        while next.len() < size {
            if attempts >= max_attempts {
                return Err(EvotradeError::Exhaustion {
                    generation: self.population.generation(),
                    attempts,
                });
            }
            attempts += 1;

            let p1 = tournament_selection(parents, self.config.tournament_size, &mut self.rng);
            let p2 = tournament_selection(parents, self.config.tournament_size, &mut self.rng);
            let mut child = self.population.crossover(&parents[p1], &parents[p2], &mut self.rng);
            child.genome = self.population.mutate(&child.genome, self.config.mutation_rate, &mut self.rng);

            if self.evaluator.is_structurally_valid(&child.genome) {
                next.push(child);
            }
        }

        log::debug!(
            "Bred {} children in {} attempts",
            open_slots,
            attempts
        );
        Ok(next)
    }

    pub fn config(&self) -> &EvolverConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &FitnessEvaluator<B> {
        &self.evaluator
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn history(&self) -> &[GenerationStats] {
        self.population.history()
    }

    pub fn best_individuals(&self) -> &[Individual] {
        &self.best_individuals
    }

    pub fn best_fitness_ever(&self) -> f64 {
        self.best_fitness_ever
    }

    pub fn phase(&self) -> EvolutionPhase {
        self.phase
    }
}

/// Callback that ignores every event; generation summaries still go to the log
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_generation_complete(&mut self, _report: &GenerationReport) {}
}
