use crate::config::AppConfig;
use crate::data::PriceSeries;
use crate::engines::generation::{
    CancellationToken, EvolutionSummary, Evolver, FitnessEvaluator, FitnessFunction,
    GenerationReport, GenerationStats, Individual, ProgressCallback,
};
use crate::error::Result;
use crate::services::reporting::ResultRecord;
use anyhow::{anyhow, Context};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Everything a finished search produced
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: Vec<Individual>,
    pub history: Vec<GenerationStats>,
    pub records: Vec<ResultRecord>,
}

/// Build the evaluator and evolver described by `config` and run them
pub fn run_search<C: ProgressCallback + ?Sized>(
    prices: Arc<PriceSeries>,
    config: &AppConfig,
    callback: &mut C,
    cancel: &CancellationToken,
) -> Result<SearchOutcome> {
    config.validate()?;
    let strategy = &config.strategy;

    let evaluator = FitnessEvaluator::new(
        strategy.kind,
        config.backtesting.to_backtester(),
        FitnessFunction::from(strategy.fitness),
        prices,
    );
    let mut evolver = Evolver::new(
        config.evolution.to_evolver_config(&strategy.symbol, &strategy.timeframe),
        strategy.resolved_param_ranges()?,
        evaluator,
    )?;

    let best = evolver.evolve_with(callback, cancel)?;
    let records = best
        .iter()
        .filter_map(|individual| ResultRecord::from_individual(individual, &strategy.symbol, &strategy.timeframe))
        .collect();

    Ok(SearchOutcome {
        best,
        history: evolver.history().to_vec(),
        records,
    })
}

/// Progress update from evolution thread
#[derive(Clone, Debug)]
pub struct ProgressUpdate {
    pub generation: usize,
    pub total_generations: usize,
    pub best_fitness: f64,
    pub avg_fitness: f64,
    pub best_fitness_ever: f64,
    pub finished: bool,
    pub status: String,
}

/// Result from evolution run
pub type EvolutionResult = anyhow::Result<SearchOutcome>;

/// Progress callback that sends updates through channel
struct EvolutionProgressCallback {
    progress_tx: Sender<ProgressUpdate>,
    total_generations: usize,
    last_report: Option<GenerationReport>,
}

impl ProgressCallback for EvolutionProgressCallback {
    fn on_generation_complete(&mut self, report: &GenerationReport) {
        self.total_generations = report.total_generations;
        let _ = self.progress_tx.send(ProgressUpdate {
            generation: report.generation + 1,
            total_generations: report.total_generations,
            best_fitness: report.stats.best_fitness,
            avg_fitness: report.stats.avg_fitness,
            best_fitness_ever: report.best_fitness_ever,
            finished: false,
            status: format!(
                "Generation {}/{} - Best: {:.2}",
                report.generation + 1,
                report.total_generations,
                report.stats.best_fitness
            ),
        });
        self.last_report = Some(report.clone());
    }

    fn on_evolution_complete(&mut self, summary: &EvolutionSummary) {
        let (best_fitness, avg_fitness) = self
            .last_report
            .as_ref()
            .map(|r| (r.stats.best_fitness, r.stats.avg_fitness))
            .unwrap_or((summary.best_fitness, summary.best_fitness));

        let _ = self.progress_tx.send(ProgressUpdate {
            generation: summary.generations_run,
            total_generations: self.total_generations,
            best_fitness,
            avg_fitness,
            best_fitness_ever: summary.best_fitness,
            finished: true,
            status: format!(
                "Complete after {} generations ({:?})",
                summary.generations_run, summary.stop_reason
            ),
        });
    }
}

/// Runs a search on a background thread and streams progress
pub struct EvolutionRunner {
    handle: Option<JoinHandle<EvolutionResult>>,
    progress_rx: Receiver<ProgressUpdate>,
    cancel: CancellationToken,
}

impl EvolutionRunner {
    /// Start evolution in background thread
    pub fn start(prices: Arc<PriceSeries>, config: AppConfig) -> Result<Self> {
        let (progress_tx, progress_rx) = channel();
        let cancel = CancellationToken::new();
        let thread_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("evotrade-evolution".to_string())
            .spawn(move || {
                let mut callback = EvolutionProgressCallback {
                    progress_tx,
                    total_generations: 0,
                    last_report: None,
                };
                run_search(prices, &config, &mut callback, &thread_cancel).context("Evolution failed")
            })?;

        Ok(Self {
            handle: Some(handle),
            progress_rx,
            cancel,
        })
    }

    /// Poll for progress updates (non-blocking)
    pub fn poll_progress(&self) -> Option<ProgressUpdate> {
        self.progress_rx.try_recv().ok()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Check if evolution is complete and get results
    pub fn try_get_results(&mut self) -> Option<EvolutionResult> {
        let handle = self.handle.take()?;
        if handle.is_finished() {
            Some(Self::join(handle))
        } else {
            // Not finished yet, put handle back
            self.handle = Some(handle);
            None
        }
    }

    /// Block until the search finishes
    pub fn wait(mut self) -> EvolutionResult {
        match self.handle.take() {
            Some(handle) => Self::join(handle),
            None => Err(anyhow!("Evolution results were already taken")),
        }
    }

    /// Ask the search to stop after the current generation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn join(handle: JoinHandle<EvolutionResult>) -> EvolutionResult {
        handle
            .join()
            .unwrap_or_else(|_| Err(anyhow!("Evolution thread panicked")))
    }
}

impl Drop for EvolutionRunner {
    fn drop(&mut self) {
        self.cancel();
    }
}
