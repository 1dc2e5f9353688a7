//! Constrained random search
//!
//! The simplest strategy: up to the configured number of independent
//! attempts, each perturbing a uniformly-random count of randomly chosen
//! mutable features to uniform values within their bounds. Accepts any
//! perturbation that reaches the desired outcome, differs from the
//! original, and is not a near-duplicate of an earlier acceptance.

use rand::seq::index::sample;
use rand::Rng;

use super::SearchContext;

pub(crate) fn generate<R: Rng>(ctx: &SearchContext<'_>, rng: &mut R) -> Vec<Vec<f64>> {
    let mut accepted: Vec<Vec<f64>> = Vec::new();
    if ctx.max_changes == 0 || ctx.n_candidates == 0 {
        return accepted;
    }
    let mutable = ctx.constraints.mutable_indices();
    if mutable.is_empty() {
        return accepted;
    }

    let max_k = ctx.max_changes.min(mutable.len());
    for _ in 0..ctx.budget.random_attempts {
        if accepted.len() >= ctx.n_candidates || ctx.cancelled() {
            break;
        }

        // Change count drawn uniformly, not weighted.
        let k = rng.random_range(1..=max_k);
        let mut candidate = ctx.instance.values().to_vec();
        for pick in sample(rng, mutable.len(), k) {
            let i = mutable[pick];
            candidate[i] = ctx.constraints.get(i).sample(rng);
        }

        let Some(prediction) = ctx.oracle.predict_one(&candidate) else {
            if ctx.oracle.exhausted() {
                break;
            }
            continue; // model failed on this perturbation; skip it
        };
        if ctx.desired.matches(prediction)
            && ctx.differs_from_original(&candidate)
            && !ctx.is_duplicate(&candidate, &accepted)
        {
            accepted.push(candidate);
        }
    }
    accepted
}
