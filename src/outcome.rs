//! Desired-outcome policy
//!
//! Two shared decisions live here: what outcome to aim for when the caller
//! does not say, and the single predicate deciding whether a prediction
//! counts as having reached it. Every search strategy and the evaluator
//! defer to this predicate, so "did we flip the prediction" means exactly
//! one thing throughout the engine.

use serde::{Deserialize, Serialize};

/// The outcome a counterfactual search is driving toward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DesiredOutcome {
    /// A class index (classification). Matched by truncating the model's
    /// prediction to an integer and comparing exactly.
    Class(i64),
    /// A target value (regression). Matched within an absolute tolerance
    /// of 0.1.
    Value(f64),
}

impl DesiredOutcome {
    /// Whether `prediction` reaches this outcome.
    pub fn matches(&self, prediction: f64) -> bool {
        match self {
            DesiredOutcome::Class(c) => prediction as i64 == *c,
            DesiredOutcome::Value(v) => (prediction - v).abs() < 0.1,
        }
    }

    /// The outcome as a scalar target, used by the gradient strategy to
    /// orient its steps.
    pub fn target_value(&self) -> f64 {
        match self {
            DesiredOutcome::Class(c) => *c as f64,
            DesiredOutcome::Value(v) => *v,
        }
    }

    /// Default outcome when the caller supplies none:
    ///
    /// - binary classifier (two probabilities): flip the predicted class
    /// - multi-class: the class with the second-highest probability
    /// - regression (no probabilities): scale the prediction by 0.8 when
    ///   non-negative, 1.2 when negative, pushing it toward zero
    pub fn resolve_default(prediction: f64, probabilities: Option<&[f64]>) -> Self {
        match probabilities {
            Some(probs) if probs.len() == 2 => DesiredOutcome::Class(1 - prediction as i64),
            Some(probs) if probs.len() > 2 => {
                DesiredOutcome::Class(second_highest_index(probs) as i64)
            }
            _ => {
                let scale = if prediction >= 0.0 { 0.8 } else { 1.2 };
                DesiredOutcome::Value(scale * prediction)
            }
        }
    }
}

/// Index of the second-largest value, ties resolved to the earliest index.
fn second_highest_index(probs: &[f64]) -> usize {
    let mut best = 0;
    for (i, &p) in probs.iter().enumerate() {
        if p > probs[best] {
            best = i;
        }
    }
    let mut second = usize::MAX;
    for (i, &p) in probs.iter().enumerate() {
        if i == best {
            continue;
        }
        if second == usize::MAX || p > probs[second] {
            second = i;
        }
    }
    second
}
