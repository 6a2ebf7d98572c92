pub mod evolution_runner;
pub mod reporting;

pub use evolution_runner::{run_search, EvolutionResult, EvolutionRunner, ProgressUpdate, SearchOutcome};
pub use reporting::{ResultRecord, ResultReporter, SavedReport};
