//! Candidate evaluation
//!
//! Turns raw candidate vectors into scored counterfactuals: one model call
//! (plus one `predict_proba` call when supported) per candidate, a change
//! list at relative tolerance `1e-3`, a distance under the chosen metric,
//! and `proximity_score = 1 / (1 + distance)`. The returned list is always
//! sorted descending by proximity score — that ordering is the canonical
//! ranking for every downstream consumer. Ties keep their evaluation order.

use serde::{Deserialize, Serialize};

use crate::engine::Oracle;
use crate::instance::Instance;
use crate::outcome::DesiredOutcome;

/// Relative tolerance below which two feature values count as unchanged.
pub(crate) const CHANGE_RTOL: f64 = 1e-3;

/// Whether two scalars are equal within [`CHANGE_RTOL`].
pub(crate) fn values_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= CHANGE_RTOL * a.abs().max(b.abs())
}

/// Whether two vectors are elementwise equal within [`CHANGE_RTOL`].
pub(crate) fn vectors_close(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| values_close(x, y))
}

/// Distance metric between an original and a counterfactual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Euclidean,
    Manhattan,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        DistanceMetric::Euclidean
    }
}

impl DistanceMetric {
    /// Parse a metric name leniently: any unrecognized name falls back to
    /// Euclidean. Unlike the optimization method, this is a documented
    /// silent fallback, not an error.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => DistanceMetric::Euclidean,
            "manhattan" | "l1" => DistanceMetric::Manhattan,
            other => {
                log::debug!("unrecognized distance metric '{other}', using euclidean");
                DistanceMetric::Euclidean
            }
        }
    }

    /// Metric name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Manhattan => "manhattan",
        }
    }

    /// Distance between two equal-length vectors.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(&x, &y)| (x - y).powi(2))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => {
                a.iter().zip(b).map(|(&x, &y)| (x - y).abs()).sum()
            }
        }
    }
}

/// Direction of a single feature change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Increase,
    Decrease,
}

impl ChangeDirection {
    /// Imperative verb for recommendation text.
    pub fn verb(&self) -> &'static str {
        match self {
            ChangeDirection::Increase => "Increase",
            ChangeDirection::Decrease => "Decrease",
        }
    }
}

/// One feature that differs between the original and a counterfactual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureChange {
    pub feature: String,
    pub original_value: f64,
    pub counterfactual_value: f64,
    /// Absolute size of the change.
    pub magnitude: f64,
    pub direction: ChangeDirection,
    /// Change relative to the original value, in percent. `None` when the
    /// original value is exactly zero.
    pub change_percentage: Option<f64>,
}

/// A candidate scored against the original instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedCounterfactual {
    /// Full counterfactual feature vector.
    pub values: Vec<f64>,
    pub prediction: f64,
    pub probabilities: Option<Vec<f64>>,
    /// Features differing beyond the relative tolerance, in feature order.
    pub changes: Vec<FeatureChange>,
    pub distance: f64,
    /// Number of changed features.
    pub sparsity: usize,
    /// `1 / (1 + distance)`, in `(0, 1]`.
    pub proximity_score: f64,
    pub achieves_desired_outcome: bool,
}

/// Score every candidate and sort descending by proximity. Candidates the
/// model fails on (or that exceed the call budget) are logged and skipped.
pub(crate) fn evaluate_candidates(
    oracle: &Oracle<'_>,
    original: &Instance,
    candidates: Vec<Vec<f64>>,
    desired: DesiredOutcome,
    metric: DistanceMetric,
) -> Vec<EvaluatedCounterfactual> {
    let mut evaluated: Vec<EvaluatedCounterfactual> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(prediction) = oracle.predict_one(&candidate) else {
            log::warn!("skipping candidate: prediction unavailable");
            continue;
        };
        let probabilities = oracle.proba_one(&candidate);

        let changes = diff_features(original, &candidate);
        let distance = metric.distance(original.values(), &candidate);
        let sparsity = changes.len();
        evaluated.push(EvaluatedCounterfactual {
            values: candidate,
            prediction,
            probabilities,
            changes,
            distance,
            sparsity,
            proximity_score: 1.0 / (1.0 + distance),
            achieves_desired_outcome: desired.matches(prediction),
        });
    }

    // Stable sort keeps evaluation order on ties.
    evaluated.sort_by(|a, b| {
        b.proximity_score
            .partial_cmp(&a.proximity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    evaluated
}

/// Changes between the original instance and a candidate, one entry per
/// feature differing beyond [`CHANGE_RTOL`].
fn diff_features(original: &Instance, candidate: &[f64]) -> Vec<FeatureChange> {
    original
        .values()
        .iter()
        .zip(candidate)
        .enumerate()
        .filter(|(_, (&orig, &cf))| !values_close(orig, cf))
        .map(|(i, (&orig, &cf))| FeatureChange {
            feature: original.name(i).to_string(),
            original_value: orig,
            counterfactual_value: cf,
            magnitude: (cf - orig).abs(),
            direction: if cf > orig {
                ChangeDirection::Increase
            } else {
                ChangeDirection::Decrease
            },
            change_percentage: if orig == 0.0 {
                None
            } else {
                Some((cf - orig) / orig * 100.0)
            },
        })
        .collect()
}
