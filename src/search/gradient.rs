//! Gradient-style local search
//!
//! Iterative descent on the squared error between the model's prediction
//! and the desired scalar target, with the gradient estimated by forward
//! finite differences (one model call per selected feature per iteration).
//! Each attempt selects its features once, up front: the `max_changes`
//! mutable features with the largest gradient magnitude at the original
//! instance, ties resolved by feature order. The start jitter and every
//! descent step touch only that set, so no trajectory can change more
//! features than the budget allows.

use rand::Rng;

use super::SearchContext;

/// Run up to `2 * n_candidates` descent attempts, collecting candidates
/// that reach the desired outcome and differ from the original.
pub(crate) fn generate<R: Rng>(ctx: &SearchContext<'_>, rng: &mut R) -> Vec<Vec<f64>> {
    let mut accepted: Vec<Vec<f64>> = Vec::new();
    if ctx.max_changes == 0 || ctx.n_candidates == 0 {
        return accepted;
    }

    let attempts = 2 * ctx.n_candidates;
    for _ in 0..attempts {
        if accepted.len() >= ctx.n_candidates || ctx.cancelled() {
            break;
        }
        match descend(ctx, rng) {
            Some(candidate) if !ctx.is_duplicate(&candidate, &accepted) => {
                accepted.push(candidate);
            }
            _ => {
                if ctx.oracle.exhausted() {
                    break;
                }
            }
        }
    }
    accepted
}

/// One descent attempt. Returns a candidate only if it reaches the desired
/// outcome; converged-without-success attempts are dropped.
fn descend<R: Rng>(ctx: &SearchContext<'_>, rng: &mut R) -> Option<Vec<f64>> {
    let budget = ctx.budget;
    let mutable = ctx.constraints.mutable_indices();
    if mutable.is_empty() {
        return None;
    }

    let mut x = ctx.instance.values().to_vec();

    // One selection per attempt: jitter and every subsequent step touch the
    // same features, keeping the whole trajectory within the change budget.
    let baseline = ctx.oracle.predict_one(&x)?;
    let gradient = estimate_gradient(ctx, &x, baseline, &mutable)?;
    let selected = top_k_by_magnitude(&gradient, &mutable, ctx.max_changes);
    jitter_start(ctx, &mut x, &selected, rng);

    for _ in 0..budget.gradient_iterations {
        if ctx.cancelled() {
            return None;
        }
        let prediction = ctx.oracle.predict_one(&x)?;
        if ctx.desired.matches(prediction) {
            break;
        }

        let gradient = estimate_gradient(ctx, &x, prediction, &selected)?;

        // Descent on 1/2 (prediction - target)^2.
        let residual = ctx.desired.target_value() - prediction;
        let mut step_norm_sq = 0.0;
        for &i in &selected {
            let proposed = x[i] + budget.learning_rate * residual * gradient[i];
            let clipped = ctx.constraints.get(i).clip(proposed);
            step_norm_sq += (clipped - x[i]).powi(2);
            x[i] = clipped;
        }
        if step_norm_sq.sqrt() < budget.convergence_threshold {
            break;
        }
    }

    let prediction = ctx.oracle.predict_one(&x)?;
    if ctx.desired.matches(prediction) && ctx.differs_from_original(&x) {
        Some(x)
    } else {
        None
    }
}

/// Nudge the selected features by a uniform jitter of at most `init_jitter`
/// of their range, clipped back into bounds, so repeated attempts explore
/// distinct starts.
fn jitter_start<R: Rng>(
    ctx: &SearchContext<'_>,
    x: &mut [f64],
    selected: &[usize],
    rng: &mut R,
) {
    for &i in selected {
        let constraint = ctx.constraints.get(i);
        let jitter = (rng.random::<f64>() - 0.5) * 2.0 * ctx.budget.init_jitter * constraint.span();
        x[i] = constraint.clip(x[i] + jitter);
    }
}

/// Forward finite-difference gradient over the given features.
fn estimate_gradient(
    ctx: &SearchContext<'_>,
    x: &[f64],
    base_prediction: f64,
    features: &[usize],
) -> Option<Vec<f64>> {
    let eps = ctx.budget.gradient_epsilon;
    let mut gradient = vec![0.0; x.len()];
    for &i in features {
        let mut perturbed = x.to_vec();
        perturbed[i] += eps;
        let shifted = ctx.oracle.predict_one(&perturbed)?;
        gradient[i] = (shifted - base_prediction) / eps;
    }
    Some(gradient)
}

/// Indices of the `k` mutable features with largest `|gradient|`; stable
/// sort keeps natural feature order on ties.
fn top_k_by_magnitude(gradient: &[f64], mutable: &[usize], k: usize) -> Vec<usize> {
    let mut indices = mutable.to_vec();
    indices.sort_by(|&a, &b| {
        gradient[b]
            .abs()
            .partial_cmp(&gradient[a].abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices.truncate(k);
    indices
}
