//! Genetic search
//!
//! Population-based search: individuals start as copies of the original
//! with a handful of mutable features resampled, and evolve under a fitness
//! blending outcome attainment, proximity to the original, and sparsity.
//! Predicate-satisfying individuals are harvested as they appear; the next
//! generation is built from elites plus uniform-crossover offspring of the
//! top half, with single-feature re-mutation.

use rand::seq::index::sample;
use rand::Rng;

use super::SearchContext;
use crate::evaluate::values_close;

/// Evolve a population for up to the configured generation budget,
/// harvesting at most `n_candidates` predicate-satisfying individuals.
pub(crate) fn generate<R: Rng>(ctx: &SearchContext<'_>, rng: &mut R) -> Vec<Vec<f64>> {
    let mut accepted: Vec<Vec<f64>> = Vec::new();
    if ctx.max_changes == 0 || ctx.n_candidates == 0 {
        return accepted;
    }
    let mutable = ctx.constraints.mutable_indices();
    if mutable.is_empty() {
        return accepted;
    }

    let budget = ctx.budget;
    let pop_size = budget.population_size.max(2);
    let mut population: Vec<Vec<f64>> =
        (0..pop_size).map(|_| init_individual(ctx, &mutable, rng)).collect();

    for _ in 0..budget.generations {
        if ctx.cancelled() {
            break;
        }
        let Some(predictions) = ctx.oracle.predict_batch(&population) else {
            break;
        };

        let mut fitness = vec![0.0; population.len()];
        for (i, individual) in population.iter().enumerate() {
            let reaches = ctx.desired.matches(predictions[i]);
            // Crossover can combine more changes than either parent carries;
            // only individuals within the change budget are harvested.
            if reaches
                && changed_count(ctx, individual) <= ctx.max_changes
                && ctx.differs_from_original(individual)
                && !ctx.is_duplicate(individual, &accepted)
            {
                accepted.push(individual.clone());
                if accepted.len() >= ctx.n_candidates {
                    return accepted;
                }
            }
            fitness[i] = fitness_of(ctx, individual, reaches);
        }

        population = next_generation(ctx, &population, &fitness, &mutable, rng);
    }
    accepted
}

/// Copy of the original with `min(max_changes, #mutable)` randomly chosen
/// mutable features resampled uniformly within their bounds.
fn init_individual<R: Rng>(
    ctx: &SearchContext<'_>,
    mutable: &[usize],
    rng: &mut R,
) -> Vec<f64> {
    let mut individual = ctx.instance.values().to_vec();
    let k = ctx.max_changes.min(mutable.len());
    for pick in sample(rng, mutable.len(), k) {
        let i = mutable[pick];
        individual[i] = ctx.constraints.get(i).sample(rng);
    }
    individual
}

/// Number of features differing from the original beyond tolerance.
fn changed_count(ctx: &SearchContext<'_>, individual: &[f64]) -> usize {
    individual
        .iter()
        .zip(ctx.instance.values())
        .filter(|(&a, &b)| !values_close(a, b))
        .count()
}

/// Weighted blend of outcome attainment, proximity, and sparsity.
fn fitness_of(ctx: &SearchContext<'_>, individual: &[f64], reaches_outcome: bool) -> f64 {
    let original = ctx.instance.values();
    let l2: f64 = individual
        .iter()
        .zip(original)
        .map(|(&a, &b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt();
    let changed = changed_count(ctx, individual);

    let w = ctx.fitness;
    w.outcome * f64::from(u8::from(reaches_outcome))
        + w.proximity * (1.0 / (1.0 + l2))
        + w.sparsity * (1.0 / (1.0 + changed as f64))
}

/// Elites carried unchanged plus uniform-crossover offspring of parents
/// drawn from the top half, each offspring re-mutated in a single feature
/// at the configured rate.
fn next_generation<R: Rng>(
    ctx: &SearchContext<'_>,
    population: &[Vec<f64>],
    fitness: &[f64],
    mutable: &[usize],
    rng: &mut R,
) -> Vec<Vec<f64>> {
    let pop_size = population.len();
    let mut order: Vec<usize> = (0..pop_size).collect();
    order.sort_by(|&a, &b| {
        fitness[b].partial_cmp(&fitness[a]).unwrap_or(std::cmp::Ordering::Equal)
    });

    let n_elite = ((pop_size as f64 * ctx.budget.elite_fraction) as usize).max(1);
    let n_parents = (pop_size / 2).max(2);

    let mut next: Vec<Vec<f64>> = order[..n_elite]
        .iter()
        .map(|&i| population[i].clone())
        .collect();

    while next.len() < pop_size {
        let pa = &population[order[rng.random_range(0..n_parents)]];
        let pb = &population[order[rng.random_range(0..n_parents)]];
        let mut child: Vec<f64> = pa
            .iter()
            .zip(pb)
            .map(|(&a, &b)| if rng.random::<f64>() < 0.5 { a } else { b })
            .collect();
        if rng.random::<f64>() < ctx.budget.mutation_rate {
            let i = mutable[rng.random_range(0..mutable.len())];
            child[i] = ctx.constraints.get(i).sample(rng);
        }
        next.push(child);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::constraints::ConstraintSet;
    use crate::engine::Oracle;
    use crate::instance::Instance;
    use crate::model::FnModel;
    use crate::outcome::DesiredOutcome;
    use crate::search::{FitnessWeights, SearchBudget};

    fn first_feature(x: &[f64]) -> f64 {
        x[0]
    }

    #[test]
    fn test_changed_count_uses_relative_tolerance() {
        let model = FnModel::new(first_feature as fn(&[f64]) -> f64);
        let oracle = Oracle::new(&model, None);
        let instance = Instance::from_values(vec![10.0, 20.0, 30.0]);
        let constraints = ConstraintSet::prepare(&HashMap::new(), &instance);
        let budget = SearchBudget::default();
        let fitness = FitnessWeights::default();
        let ctx = SearchContext {
            oracle: &oracle,
            instance: &instance,
            constraints: &constraints,
            desired: DesiredOutcome::Class(1),
            max_changes: 2,
            n_candidates: 3,
            budget: &budget,
            fitness: &fitness,
            cancel: None,
        };

        assert_eq!(changed_count(&ctx, &[10.0, 20.0, 30.0]), 0);
        assert_eq!(changed_count(&ctx, &[10.0, 25.0, 30.0]), 1);
        // A sub-tolerance wiggle does not count as a change.
        assert_eq!(changed_count(&ctx, &[10.000001, 20.0, 31.0]), 1);
    }

    #[test]
    fn test_fitness_ranks_outcome_above_proximity() {
        let model = FnModel::new(first_feature as fn(&[f64]) -> f64);
        let oracle = Oracle::new(&model, None);
        let instance = Instance::from_values(vec![10.0, 20.0, 30.0]);
        let constraints = ConstraintSet::prepare(&HashMap::new(), &instance);
        let budget = SearchBudget::default();
        let fitness = FitnessWeights::default();
        let ctx = SearchContext {
            oracle: &oracle,
            instance: &instance,
            constraints: &constraints,
            desired: DesiredOutcome::Class(1),
            max_changes: 2,
            n_candidates: 3,
            budget: &budget,
            fitness: &fitness,
            cancel: None,
        };

        let close = [10.0, 20.5, 30.0];
        let far = [10.0, 29.0, 30.0];
        // Among outcome-reaching individuals, closer is fitter.
        assert!(fitness_of(&ctx, &close, true) > fitness_of(&ctx, &far, true));
        // A distant success still beats a nearby failure.
        assert!(fitness_of(&ctx, &far, true) > fitness_of(&ctx, &close, false));
        // Unchanged and reaching scores the full weight sum.
        let best = fitness_of(&ctx, &[10.0, 20.0, 30.0], true);
        assert!((best - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_next_generation_keeps_size_and_elites() {
        let model = FnModel::new(first_feature as fn(&[f64]) -> f64);
        let oracle = Oracle::new(&model, None);
        let instance = Instance::from_values(vec![10.0, 20.0, 30.0]);
        let constraints = ConstraintSet::prepare(&HashMap::new(), &instance);
        let budget = SearchBudget::default();
        let fitness_weights = FitnessWeights::default();
        let ctx = SearchContext {
            oracle: &oracle,
            instance: &instance,
            constraints: &constraints,
            desired: DesiredOutcome::Class(1),
            max_changes: 2,
            n_candidates: 3,
            budget: &budget,
            fitness: &fitness_weights,
            cancel: None,
        };

        let population: Vec<Vec<f64>> = vec![
            vec![10.0, 20.0, 30.0],
            vec![10.0, 21.0, 30.0],
            vec![10.0, 25.0, 30.0],
            vec![10.0, 29.0, 30.0],
        ];
        let fitness = vec![0.1, 0.9, 0.5, 0.3];
        let mutable = ctx.constraints.mutable_indices();
        let mut rng = StdRng::seed_from_u64(3);
        let next = next_generation(&ctx, &population, &fitness, &mutable, &mut rng);

        assert_eq!(next.len(), population.len());
        // n_elite = max(4 * 0.25, 1) = 1: the fittest individual survives
        // unchanged at the front.
        assert_eq!(next[0], population[1]);
        // Offspring features come from the top-half parents (individuals 1
        // and 2), except for at most one mutated feature, which must stay
        // within its constraint bounds.
        for child in &next[1..] {
            let foreign: Vec<usize> = (0..child.len())
                .filter(|&i| child[i] != population[1][i] && child[i] != population[2][i])
                .collect();
            assert!(foreign.len() <= 1, "{child:?}");
            for &i in &foreign {
                let c = ctx.constraints.get(i);
                assert!(child[i] >= c.min && child[i] <= c.max);
            }
        }
    }
}
