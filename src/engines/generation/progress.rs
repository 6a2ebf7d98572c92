use super::evolution_engine::{EvolutionSummary, GenerationReport, ProgressCallback};

/// Prints one line per generation to stdout
pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize, population_size: usize) {
        println!("Generation {} starting ({} individuals)...", generation + 1, population_size);
    }

    fn on_generation_complete(&mut self, report: &GenerationReport) {
        println!(
            "Generation {}/{} complete. Best fitness: {:.4}, avg: {:.4}, evaluated: {}",
            report.generation + 1,
            report.total_generations,
            report.stats.best_fitness,
            report.stats.avg_fitness,
            report.evaluated
        );
        if let Some(config) = report.best.as_ref().and_then(|b| b.metadata.config.as_ref()) {
            println!("  Best parameters: {}", config);
        }
    }

    fn on_evolution_complete(&mut self, summary: &EvolutionSummary) {
        println!(
            "Evolution finished after {} generations ({:?}). Best fitness: {:.4}",
            summary.generations_run, summary.stop_reason, summary.best_fitness
        );
    }
}
