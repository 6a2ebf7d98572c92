use evotrade::data::PriceSeries;
use evotrade::engines::evaluation::BacktestEvaluator;
use evotrade::engines::generation::evaluator::FitnessEvaluator;
use evotrade::engines::generation::evolution_engine::{
    CancellationToken, EliteDedup, EvolutionPhase, EvolutionSummary, Evolver, EvolverConfig,
    GenerationReport, ProgressCallback, StopReason,
};
use evotrade::engines::generation::fitness::FitnessMetric;
use evotrade::engines::generation::genome::{EvaluationOutcome, GeneValue, ParamBounds, ParamRanges, UNFIT};
use evotrade::engines::generation::strategy::{StrategyConfig, StrategyKind};
use evotrade::types::{BacktestStats, Candle};
use evotrade::{EvotradeError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scores a configuration by how close its fast period is to 20
struct PeakBacktester;

impl BacktestEvaluator for PeakBacktester {
    fn run(&self, config: &StrategyConfig, _prices: &PriceSeries) -> Result<BacktestStats> {
        let StrategyConfig::DoubleEmaBreakout { long, .. } = config;
        let fast = long.map(|side| side.fast_period as f64).unwrap_or(0.0);
        Ok(BacktestStats {
            total_return_pct: 100.0 - (fast - 20.0).powi(2),
            ..Default::default()
        })
    }
}

/// Same score for every configuration
struct ConstantBacktester;

impl BacktestEvaluator for ConstantBacktester {
    fn run(&self, _config: &StrategyConfig, _prices: &PriceSeries) -> Result<BacktestStats> {
        Ok(BacktestStats {
            total_return_pct: 5.0,
            ..Default::default()
        })
    }
}

/// Fails for odd fast periods
struct FlakyBacktester;

impl BacktestEvaluator for FlakyBacktester {
    fn run(&self, config: &StrategyConfig, prices: &PriceSeries) -> Result<BacktestStats> {
        let StrategyConfig::DoubleEmaBreakout { long, .. } = config;
        match long {
            Some(side) if side.fast_period % 2 == 1 => {
                Err(EvotradeError::Backtest("odd period".to_string()))
            }
            _ => PeakBacktester.run(config, prices),
        }
    }
}

/// Counts how often the search asks for a backtest
#[derive(Default)]
struct CountingBacktester {
    calls: AtomicUsize,
}

impl BacktestEvaluator for CountingBacktester {
    fn run(&self, config: &StrategyConfig, prices: &PriceSeries) -> Result<BacktestStats> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        PeakBacktester.run(config, prices)
    }
}

#[derive(Default)]
struct RecordingProgress {
    reports: Vec<GenerationReport>,
    started: Vec<usize>,
    summary: Option<EvolutionSummary>,
}

impl ProgressCallback for RecordingProgress {
    fn on_generation_start(&mut self, generation: usize, _population_size: usize) {
        self.started.push(generation);
    }

    fn on_generation_complete(&mut self, report: &GenerationReport) {
        self.reports.push(report.clone());
    }

    fn on_evolution_complete(&mut self, summary: &EvolutionSummary) {
        self.summary = Some(summary.clone());
    }
}

fn prices() -> Arc<PriceSeries> {
    let candles: Vec<Candle> = (0..20)
        .map(|i| {
            let base = 100.0 + (i as f64).sin();
            Candle::new(base, base + 1.0, base - 1.0, base, 1.0)
        })
        .collect();
    Arc::new(PriceSeries::from_candles(&candles).unwrap())
}

fn ranges() -> ParamRanges {
    ParamRanges::new([
        ("ema_fast", ParamBounds::int(5, 50)),
        ("ema_slow", ParamBounds::int(55, 200)),
        ("stop", ParamBounds::int(5, 21)),
        ("rr", ParamBounds::int(15, 55)),
    ])
    .unwrap()
}

fn config(population_size: usize, generations: usize) -> EvolverConfig {
    EvolverConfig {
        symbol: "TEST".to_string(),
        timeframe: "1h".to_string(),
        population_size,
        generations,
        elite_size: 4,
        mutation_rate: 0.3,
        tournament_size: 3,
        stagnation_limit: 0,
        seed: Some(7),
        threads: Some(2),
        ..Default::default()
    }
}

fn evolver<B: BacktestEvaluator>(
    backtester: B,
    config: EvolverConfig,
    ranges: ParamRanges,
) -> Result<Evolver<B>> {
    let evaluator = FitnessEvaluator::new(
        StrategyKind::DoubleEmaBreakout,
        backtester,
        FitnessMetric::TotalReturn.into(),
        prices(),
    );
    Evolver::new(config, ranges, evaluator)
}

#[test]
fn test_evolution_returns_sorted_elites() {
    let mut engine = evolver(PeakBacktester, config(30, 8), ranges()).unwrap();
    let best = engine.evolve().unwrap();

    assert!(!best.is_empty() && best.len() <= 4);
    for pair in best.windows(2) {
        assert!(pair[0].rank_fitness() >= pair[1].rank_fitness());
    }
    assert_eq!(engine.history().len(), 8);
    assert_eq!(engine.phase(), EvolutionPhase::Done);
    assert_eq!(best[0].rank_fitness(), engine.best_fitness_ever());
}

#[test]
fn test_stagnation_stops_early() {
    let mut cfg = config(20, 100);
    cfg.stagnation_limit = 10;
    let mut engine = evolver(ConstantBacktester, cfg, ranges()).unwrap();
    let mut progress = RecordingProgress::default();

    engine.evolve_with(&mut progress, &CancellationToken::new()).unwrap();

    let summary = progress.summary.unwrap();
    assert_eq!(summary.stop_reason, StopReason::Stagnation);
    assert_eq!(progress.reports.last().map(|r| r.generation), Some(10));
    assert_eq!(engine.history().len(), 11);
    assert_eq!(summary.generations_run, 11);
}

#[test]
fn test_zero_stagnation_limit_runs_all_generations() {
    let mut engine = evolver(ConstantBacktester, config(10, 15), ranges()).unwrap();
    let mut progress = RecordingProgress::default();

    engine.evolve_with(&mut progress, &CancellationToken::new()).unwrap();

    assert_eq!(progress.summary.unwrap().stop_reason, StopReason::GenerationLimit);
    assert_eq!(progress.reports.len(), 15);
}

#[test]
fn test_population_size_is_constant() {
    let mut engine = evolver(PeakBacktester, config(25, 6), ranges()).unwrap();
    let mut progress = RecordingProgress::default();

    engine.evolve_with(&mut progress, &CancellationToken::new()).unwrap();

    assert_eq!(progress.started, vec![0, 1, 2, 3, 4, 5]);
    assert!(progress.reports.iter().all(|r| r.population_size == 25));
    assert_eq!(engine.population().len(), 25);
}

#[test]
fn test_best_fitness_ever_never_decreases() {
    for seed in 0..5 {
        let mut cfg = config(20, 10);
        cfg.seed = Some(seed);
        let mut engine = evolver(PeakBacktester, cfg, ranges()).unwrap();
        let mut progress = RecordingProgress::default();
        engine.evolve_with(&mut progress, &CancellationToken::new()).unwrap();

        for pair in progress.reports.windows(2) {
            assert!(pair[1].best_fitness_ever >= pair[0].best_fitness_ever);
        }
    }
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = || {
        let mut engine = evolver(PeakBacktester, config(20, 5), ranges()).unwrap();
        let best = engine.evolve().unwrap();
        (
            best.into_iter().map(|i| i.genome).collect::<Vec<_>>(),
            engine.history().to_vec(),
        )
    };

    assert_eq!(run(), run());
}

#[test]
fn test_failed_backtests_do_not_abort_the_run() {
    let mut engine = evolver(FlakyBacktester, config(30, 5), ranges()).unwrap();
    let best = engine.evolve().unwrap();

    assert_eq!(engine.history().len(), 5);
    assert!(best[0].rank_fitness() > UNFIT);
    assert!(engine
        .population()
        .individuals()
        .iter()
        .all(|i| i.fitness.is_some()));
}

#[test]
fn test_failed_backtest_marks_individual_unfit() {
    let mut engine = evolver(FlakyBacktester, config(30, 1), ranges()).unwrap();
    engine.evolve().unwrap();

    let mut failed = 0;
    for individual in engine.population().individuals() {
        match individual.genome.get("ema_fast") {
            Some(GeneValue::Int(fast)) if fast % 2 == 1 => {
                failed += 1;
                assert_eq!(individual.fitness, Some(UNFIT));
                assert!(matches!(individual.metadata.outcome, EvaluationOutcome::Failed { .. }));
                assert!(individual.metadata.stats.is_none());
            }
            _ => {
                assert!(individual.rank_fitness() > UNFIT);
                assert_eq!(individual.metadata.outcome, EvaluationOutcome::Evaluated);
            }
        }
    }
    assert!(failed > 0);
}

#[test]
fn test_survivors_are_not_backtested_again() {
    let mut cfg = config(20, 4);
    cfg.elite_size = 5;
    cfg.elite_dedup = EliteDedup::None;
    let mut engine = evolver(CountingBacktester::default(), cfg, ranges()).unwrap();
    engine.evolve().unwrap();

    // Every genome is valid: 20 initial evaluations, then 15 new children per generation
    let calls = engine.evaluator().backtester().calls.load(Ordering::SeqCst);
    assert_eq!(calls, 20 + 3 * 15);
}

#[test]
fn test_elite_dedup_removes_identical_genomes() {
    let narrow = ParamRanges::new([
        ("ema_fast", ParamBounds::int(10, 10)),
        ("ema_slow", ParamBounds::int(60, 60)),
        ("stop", ParamBounds::int(7, 7)),
        ("rr", ParamBounds::int(20, 20)),
    ])
    .unwrap();

    let mut engine = evolver(PeakBacktester, config(10, 2), narrow.clone()).unwrap();
    assert_eq!(engine.evolve().unwrap().len(), 1);

    let mut cfg = config(10, 2);
    cfg.elite_dedup = EliteDedup::None;
    let mut engine = evolver(PeakBacktester, cfg, narrow).unwrap();
    assert_eq!(engine.evolve().unwrap().len(), 4);
}

#[test]
fn test_cancellation_stops_after_current_generation() {
    let mut engine = evolver(PeakBacktester, config(10, 50), ranges()).unwrap();
    let mut progress = RecordingProgress::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let best = engine.evolve_with(&mut progress, &cancel).unwrap();

    assert!(!best.is_empty());
    assert_eq!(progress.reports.len(), 1);
    assert_eq!(progress.summary.unwrap().stop_reason, StopReason::Cancelled);
}

#[test]
fn test_unbreedable_ranges_exhaust() {
    let inverted = ParamRanges::new([
        ("ema_fast", ParamBounds::int(60, 80)),
        ("ema_slow", ParamBounds::int(10, 50)),
        ("stop", ParamBounds::int(5, 21)),
        ("rr", ParamBounds::int(15, 55)),
    ])
    .unwrap();

    let mut cfg = config(10, 3);
    cfg.max_breeding_attempts_per_child = 5;
    cfg.elite_dedup = EliteDedup::None;
    let mut engine = evolver(PeakBacktester, cfg, inverted).unwrap();

    match engine.evolve() {
        Err(EvotradeError::Exhaustion { generation, attempts }) => {
            assert_eq!(generation, 0);
            assert_eq!(attempts, 5 * 6);
        }
        other => panic!("expected exhaustion, got {:?}", other.map(|b| b.len())),
    }
}

#[test]
fn test_invalid_configurations_are_rejected() {
    let cases: Vec<Box<dyn Fn(&mut EvolverConfig)>> = vec![
        Box::new(|c: &mut EvolverConfig| c.population_size = 0),
        Box::new(|c: &mut EvolverConfig| c.generations = 0),
        Box::new(|c: &mut EvolverConfig| c.elite_size = 0),
        Box::new(|c: &mut EvolverConfig| c.elite_size = c.population_size + 1),
        Box::new(|c: &mut EvolverConfig| c.mutation_rate = 1.5),
        Box::new(|c: &mut EvolverConfig| c.tournament_size = 0),
        Box::new(|c: &mut EvolverConfig| c.max_breeding_attempts_per_child = 0),
        Box::new(|c: &mut EvolverConfig| c.threads = Some(0)),
    ];

    for (i, apply) in cases.iter().enumerate() {
        let mut cfg = config(10, 3);
        apply(&mut cfg);
        let result = evolver(PeakBacktester, cfg, ranges());
        assert!(
            matches!(result, Err(EvotradeError::Configuration(_))),
            "case {} was accepted",
            i
        );
    }
}

#[test]
fn test_missing_parameter_range_is_rejected() {
    let partial = ParamRanges::new([("ema_fast", ParamBounds::int(5, 50))]).unwrap();
    let result = evolver(PeakBacktester, config(10, 3), partial);
    assert!(matches!(result, Err(EvotradeError::Configuration(_))));
}
