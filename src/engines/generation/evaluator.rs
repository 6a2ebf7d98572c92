use crate::data::PriceSeries;
use crate::engines::evaluation::BacktestEvaluator;
use crate::engines::generation::fitness::FitnessFunction;
use crate::engines::generation::genome::{
    EvaluationMetadata, EvaluationOutcome, Genome, Individual, ParamRanges, UNFIT,
};
use crate::engines::generation::strategy::StrategyKind;
use crate::error::Result;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Fitness and metadata produced for one genome
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub fitness: f64,
    pub metadata: EvaluationMetadata,
}

impl Evaluation {
    fn invalid(reason: String) -> Self {
        Self {
            fitness: UNFIT,
            metadata: EvaluationMetadata {
                outcome: EvaluationOutcome::Invalid { reason },
                ..Default::default()
            },
        }
    }

    fn failed(genome: &Genome, reason: String) -> Self {
        log::warn!("Evaluation failed for {}: {}", genome, reason);
        Self {
            fitness: UNFIT,
            metadata: EvaluationMetadata {
                outcome: EvaluationOutcome::Failed { reason },
                ..Default::default()
            },
        }
    }
}

/// Bridges genomes to the backtester: structural filter, config build,
/// backtest, scoring. Never fails; every problem becomes the unfit sentinel.
pub struct FitnessEvaluator<B: BacktestEvaluator> {
    strategy: StrategyKind,
    backtester: B,
    fitness_fn: FitnessFunction,
    prices: Arc<PriceSeries>,
}

impl<B: BacktestEvaluator> FitnessEvaluator<B> {
    pub fn new(
        strategy: StrategyKind,
        backtester: B,
        fitness_fn: FitnessFunction,
        prices: Arc<PriceSeries>,
    ) -> Self {
        Self {
            strategy,
            backtester,
            fitness_fn,
            prices,
        }
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn backtester(&self) -> &B {
        &self.backtester
    }

    pub fn fitness_function(&self) -> &FitnessFunction {
        &self.fitness_fn
    }

    pub fn prices(&self) -> &Arc<PriceSeries> {
        &self.prices
    }

    /// Every gene the strategy reads must have bounds
    pub fn check_ranges(&self, ranges: &ParamRanges) -> Result<()> {
        self.strategy.check_ranges(ranges)
    }

    pub fn is_structurally_valid(&self, genome: &Genome) -> bool {
        self.strategy.validate(genome).is_ok()
    }

    pub fn evaluate(&self, genome: &Genome) -> Evaluation {
        if let Err(reason) = self.strategy.validate(genome) {
            log::trace!("Skipping invalid genome {}: {}", genome, reason);
            return Evaluation::invalid(reason);
        }

        let config = match self.strategy.build_config(genome) {
            Ok(config) => config,
            Err(e) => return Evaluation::failed(genome, e.to_string()),
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.backtester.run(&config, &self.prices)
        }));

        let stats = match outcome {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => return Evaluation::failed(genome, e.to_string()),
            Err(payload) => {
                return Evaluation::failed(genome, format!("backtest panicked: {}", panic_message(payload.as_ref())))
            }
        };

        if let Some(field) = stats.first_non_finite() {
            return Evaluation::failed(genome, format!("statistic '{}' is not finite", field));
        }

        let fitness = self.fitness_fn.evaluate(&stats);
        if !fitness.is_finite() {
            return Evaluation::failed(
                genome,
                format!("fitness '{}' returned {}", self.fitness_fn.name(), fitness),
            );
        }

        Evaluation {
            fitness,
            metadata: EvaluationMetadata {
                outcome: EvaluationOutcome::Evaluated,
                stats: Some(stats),
                config: Some(config),
            },
        }
    }

    /// Evaluate in place unless the individual already carries a fitness
    pub fn evaluate_individual(&self, individual: &mut Individual) -> bool {
        if individual.is_evaluated() {
            return false;
        }
        let evaluation = self.evaluate(&individual.genome);
        individual.fitness = Some(evaluation.fitness);
        individual.metadata = evaluation.metadata;
        true
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
