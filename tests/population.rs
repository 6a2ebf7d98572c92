use evotrade::engines::generation::genome::{GeneValue, Individual, ParamBounds, ParamRanges, UNFIT};
use evotrade::engines::generation::population::Population;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn ranges() -> Arc<ParamRanges> {
    Arc::new(
        ParamRanges::new([
            ("ema_fast", ParamBounds::int(5, 50)),
            ("ema_slow", ParamBounds::int(10, 200)),
        ])
        .unwrap(),
    )
}

fn population_with(fitnesses: &[Option<f64>]) -> Population {
    let mut population = Population::new(fitnesses.len(), ranges());
    let mut rng = StdRng::seed_from_u64(1);
    population.initialize(&mut rng);
    for (individual, fitness) in population.individuals_mut().iter_mut().zip(fitnesses) {
        individual.fitness = *fitness;
    }
    population
}

#[test]
fn test_initialize_fills_population() {
    let mut population = Population::new(25, ranges());
    let mut rng = StdRng::seed_from_u64(8);
    population.initialize(&mut rng);

    assert_eq!(population.len(), 25);
    assert_eq!(population.generation(), 0);
    assert!(population.history().is_empty());
    assert!(population.individuals().iter().all(|i| i.fitness.is_none()));
}

#[test]
fn test_sort_puts_unfit_and_unevaluated_last() {
    let mut population = population_with(&[Some(1.0), None, Some(UNFIT), Some(5.0), Some(-3.0)]);
    population.sort_by_fitness();

    let order: Vec<f64> = population.individuals().iter().map(Individual::rank_fitness).collect();
    assert_eq!(&order[..3], &[5.0, 1.0, -3.0]);
    assert!(order[3].is_infinite() && order[4].is_infinite());
}

#[test]
fn test_sort_is_stable_for_ties() {
    let mut population = population_with(&[Some(2.0), Some(2.0), Some(2.0)]);
    let before: Vec<_> = population.individuals().iter().map(|i| i.genome.clone()).collect();
    population.sort_by_fitness();
    let after: Vec<_> = population.individuals().iter().map(|i| i.genome.clone()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_elite_is_independent_of_population() {
    let mut population = population_with(&[Some(1.0), Some(9.0), Some(4.0)]);
    let mut elite = population.get_elite(2);

    assert_eq!(elite.len(), 2);
    assert_eq!(elite[0].fitness, Some(9.0));
    assert_eq!(elite[1].fitness, Some(4.0));

    // Mutating the copy must not leak into the live population
    elite[0].genome.insert("ema_fast", GeneValue::Int(-1));
    elite[0].fitness = Some(100.0);
    assert_ne!(population.individuals()[0].genome.get("ema_fast"), Some(&GeneValue::Int(-1)));
    assert_eq!(population.individuals()[0].fitness, Some(9.0));
}

#[test]
fn test_history_includes_unfit_in_average() {
    let mut population = population_with(&[Some(10.0), Some(20.0), Some(UNFIT)]);
    population.update_history();

    let stats = population.history()[0];
    assert_eq!(stats.generation, 0);
    assert_eq!(stats.best_fitness, 20.0);
    assert_eq!(stats.avg_fitness, f64::NEG_INFINITY);
    // Diversity ignores the sentinel
    assert!((stats.diversity - 5.0).abs() < 1e-12);
}

#[test]
fn test_history_skips_unevaluated_generations() {
    let mut population = population_with(&[None, None]);
    population.update_history();
    assert!(population.history().is_empty());
}

#[test]
fn test_history_mean_over_evaluated_only() {
    let mut population = population_with(&[Some(2.0), Some(4.0), None]);
    population.update_history();
    assert_eq!(population.history()[0].avg_fitness, 3.0);
}

#[test]
fn test_diversity_of_identical_fitness_is_zero() {
    let population = population_with(&[Some(3.0), Some(3.0), Some(3.0)]);
    assert_eq!(population.calculate_diversity(), 0.0);
}

#[test]
fn test_replace_rejects_wrong_size() {
    let mut population = population_with(&[Some(1.0), Some(2.0)]);
    let one = population.individuals()[..1].to_vec();
    assert!(population.replace(one).is_err());

    let same = population.individuals().to_vec();
    assert!(population.replace(same).is_ok());
    population.advance_generation();
    assert_eq!(population.generation(), 1);
}

#[test]
fn test_population_level_operators_use_owned_ranges() {
    let population = population_with(&[Some(1.0), Some(2.0)]);
    let mut rng = StdRng::seed_from_u64(4);
    let parents = population.individuals();

    let child = population.crossover(&parents[0], &parents[1], &mut rng);
    let mutated = population.mutate(&child.genome, 1.0, &mut rng);
    for (name, value) in mutated.iter() {
        assert!(population.param_ranges().get(name).unwrap().contains(value));
    }
}
