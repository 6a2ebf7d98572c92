pub mod evaluator;
pub mod evolution_engine;
pub mod fitness;
pub mod genome;
pub mod operators;
pub mod population;
pub mod progress;
pub mod strategy;

pub use evaluator::{Evaluation, FitnessEvaluator};
pub use evolution_engine::{
    CancellationToken, EliteDedup, EvolutionPhase, EvolutionSummary, Evolver, EvolverConfig,
    GenerationReport, ProgressCallback, SilentProgress, StopReason,
};
pub use fitness::{FitnessFunction, FitnessMetric};
pub use genome::{
    EvaluationMetadata, EvaluationOutcome, GeneValue, Genome, Individual, ParamBounds, ParamRanges,
    UNFIT,
};
pub use population::{GenerationStats, Population};
pub use progress::ConsoleProgressCallback;
pub use strategy::{SideParams, StrategyConfig, StrategyKind};
