use crate::engines::generation::genome::{GeneValue, Genome, Individual, ParamBounds, ParamRanges};
use rand::seq::index::sample;
use rand::Rng;

/// Uniform draw from inclusive bounds
pub fn random_gene<R: Rng>(bounds: &ParamBounds, rng: &mut R) -> GeneValue {
    match *bounds {
        ParamBounds::Int { min, max } => GeneValue::Int(rng.gen_range(min..=max)),
        ParamBounds::Float { min, max } => GeneValue::Float(rng.gen_range(min..=max)),
    }
}

/// Generate random genome
pub fn random_genome<R: Rng>(param_ranges: &ParamRanges, rng: &mut R) -> Genome {
    let mut genome = Genome::new();
    for (name, bounds) in param_ranges.iter() {
        genome.insert(name.clone(), random_gene(bounds, rng));
    }
    genome
}

/// Tournament selection: best of `tournament_size` distinct random candidates.
///
/// Ties keep the candidate sampled first. Returns an index into `population`.
pub fn tournament_selection<R: Rng>(
    population: &[Individual],
    tournament_size: usize,
    rng: &mut R,
) -> usize {
    let amount = tournament_size.max(1).min(population.len());
    let mut candidates = sample(rng, population.len(), amount).into_iter();

    let mut best_idx = candidates.next().unwrap_or(0);
    for idx in candidates {
        if population[idx].rank_fitness() > population[best_idx].rank_fitness() {
            best_idx = idx;
        }
    }

    best_idx
}

/// Uniform crossover: every gene comes from either parent with equal odds.
pub fn crossover<R: Rng>(parent1: &Individual, parent2: &Individual, rng: &mut R) -> Individual {
    let mut child = Genome::new();

    for (name, value) in parent1.genome.iter() {
        let gene = match parent2.genome.get(name) {
            Some(other) if rng.gen_bool(0.5) => *other,
            _ => *value,
        };
        child.insert(name.clone(), gene);
    }

    Individual::new(child)
}

/// Mutation: each gene is redrawn from its bounds with probability `mutation_rate`.
pub fn mutate<R: Rng>(
    genome: &Genome,
    param_ranges: &ParamRanges,
    mutation_rate: f64,
    rng: &mut R,
) -> Genome {
    let mut mutated = genome.clone();

    for name in genome.keys() {
        if rng.gen::<f64>() < mutation_rate {
            if let Some(bounds) = param_ranges.get(name) {
                mutated.insert(name.clone(), random_gene(bounds, rng));
            }
        }
    }

    mutated
}
