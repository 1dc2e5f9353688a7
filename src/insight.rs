//! Insight and feasibility synthesis
//!
//! The final pipeline stage turns ranked counterfactuals into two summaries:
//! per-feature actionable recommendations ranked by how often each feature
//! was changed, and a feasibility score distribution over all
//! counterfactuals. Both are heuristic, first-class policies: the keyword
//! buckets behind actionability and the feasibility weights are named,
//! overridable configuration rather than buried constants.

use serde::{Deserialize, Serialize};

use crate::evaluate::{ChangeDirection, EvaluatedCounterfactual};

/// One keyword bucket mapping feature-name fragments to an actionability
/// score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionabilityBucket {
    pub keywords: Vec<String>,
    pub score: f64,
}

impl ActionabilityBucket {
    fn new(keywords: &[&str], score: f64) -> Self {
        Self {
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            score,
        }
    }
}

/// Keyword-based actionability lookup. A feature name is matched
/// case-insensitively against each bucket's keywords (substring match) in
/// bucket order; the first hit wins, otherwise `default_score` applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionabilityPolicy {
    pub buckets: Vec<ActionabilityBucket>,
    pub default_score: f64,
}

impl Default for ActionabilityPolicy {
    fn default() -> Self {
        Self {
            buckets: vec![
                ActionabilityBucket::new(
                    &["income", "education", "experience", "skill", "training"],
                    0.9,
                ),
                ActionabilityBucket::new(&["location", "employment", "debt", "savings"], 0.6),
                ActionabilityBucket::new(&["age", "gender", "race", "family"], 0.3),
            ],
            default_score: 0.5,
        }
    }
}

impl ActionabilityPolicy {
    /// Actionability score for a feature name.
    pub fn score(&self, feature_name: &str) -> f64 {
        let name = feature_name.to_lowercase();
        for bucket in &self.buckets {
            if bucket.keywords.iter().any(|k| name.contains(k.as_str())) {
                return bucket.score;
            }
        }
        self.default_score
    }
}

/// A ranked, human-readable recommendation for one frequently-changed
/// feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionableInsight {
    pub feature: String,
    /// 1-based rank by change frequency.
    pub importance_rank: usize,
    /// How many counterfactual changes touched this feature.
    pub change_frequency: usize,
    pub recommended_direction: ChangeDirection,
    pub average_change_magnitude: f64,
    pub actionability_score: f64,
    pub recommendation_text: String,
}

/// Named weights of the per-counterfactual feasibility score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityWeights {
    /// Weight of the constraint-satisfaction term. Candidates produced by
    /// the engine's own strategies always satisfy their constraints, so the
    /// term is the constant 1.0; it stays a named weight for hosts scoring
    /// externally-supplied candidates.
    pub constraint_satisfaction: f64,
    pub proximity: f64,
    pub sparsity: f64,
    pub actionability: f64,
}

impl Default for FeasibilityWeights {
    fn default() -> Self {
        Self {
            constraint_satisfaction: 0.3,
            proximity: 0.3,
            sparsity: 0.2,
            actionability: 0.2,
        }
    }
}

/// Distribution of feasibility scores over all counterfactuals; all zero
/// when none were found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeasibilitySummary {
    pub average_feasibility: f64,
    pub max_feasibility: f64,
    pub min_feasibility: f64,
    pub std_feasibility: f64,
}

impl FeasibilitySummary {
    /// Zeroed summary for the no-counterfactual case.
    pub fn empty() -> Self {
        Self {
            average_feasibility: 0.0,
            max_feasibility: 0.0,
            min_feasibility: 0.0,
            std_feasibility: 0.0,
        }
    }
}

/// Feasibility score of a single counterfactual.
pub(crate) fn feasibility_score(
    cf: &EvaluatedCounterfactual,
    weights: &FeasibilityWeights,
    policy: &ActionabilityPolicy,
) -> f64 {
    let actionability = if cf.changes.is_empty() {
        0.5
    } else {
        cf.changes.iter().map(|c| policy.score(&c.feature)).sum::<f64>()
            / cf.changes.len() as f64
    };
    weights.constraint_satisfaction * 1.0
        + weights.proximity * cf.proximity_score
        + weights.sparsity * (1.0 / (1.0 + cf.sparsity as f64))
        + weights.actionability * actionability
}

/// Aggregate feasibility over all counterfactuals.
pub(crate) fn feasibility_summary(
    counterfactuals: &[EvaluatedCounterfactual],
    weights: &FeasibilityWeights,
    policy: &ActionabilityPolicy,
) -> FeasibilitySummary {
    if counterfactuals.is_empty() {
        return FeasibilitySummary::empty();
    }
    let scores: Vec<f64> = counterfactuals
        .iter()
        .map(|cf| feasibility_score(cf, weights, policy))
        .collect();
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    FeasibilitySummary {
        average_feasibility: mean,
        max_feasibility: scores.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
        min_feasibility: scores.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
        std_feasibility: var.sqrt(),
    }
}

/// Per-feature change tally accumulated across counterfactuals.
#[derive(Debug, Default)]
struct FeatureTally {
    count: usize,
    increases: usize,
    decreases: usize,
    magnitude_sum: f64,
}

/// Derive ranked actionable insights from evaluated counterfactuals.
///
/// Features are ranked by raw change frequency descending (ties keep
/// first-seen order) and the top `top_n` are kept. The recommended
/// direction is the majority across occurrences, ties resolved toward
/// `Increase`.
pub(crate) fn derive_insights(
    counterfactuals: &[EvaluatedCounterfactual],
    policy: &ActionabilityPolicy,
    top_n: usize,
) -> Vec<ActionableInsight> {
    // Vec keeps first-appearance order, which makes frequency ties
    // deterministic.
    let mut tallies: Vec<(String, FeatureTally)> = Vec::new();
    for cf in counterfactuals {
        for change in &cf.changes {
            let idx = match tallies.iter().position(|(name, _)| name == &change.feature) {
                Some(i) => i,
                None => {
                    tallies.push((change.feature.clone(), FeatureTally::default()));
                    tallies.len() - 1
                }
            };
            let tally = &mut tallies[idx].1;
            tally.count += 1;
            match change.direction {
                ChangeDirection::Increase => tally.increases += 1,
                ChangeDirection::Decrease => tally.decreases += 1,
            }
            tally.magnitude_sum += change.magnitude;
        }
    }

    tallies.sort_by(|a, b| b.1.count.cmp(&a.1.count));
    tallies
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(rank, (feature, tally))| {
            let direction = if tally.increases >= tally.decreases {
                ChangeDirection::Increase
            } else {
                ChangeDirection::Decrease
            };
            let average_change_magnitude = tally.magnitude_sum / tally.count as f64;
            let recommendation_text = format!(
                "{} {} by approximately {:.3} to reach the desired outcome",
                direction.verb(),
                feature,
                average_change_magnitude
            );
            ActionableInsight {
                actionability_score: policy.score(&feature),
                feature,
                importance_rank: rank + 1,
                change_frequency: tally.count,
                recommended_direction: direction,
                average_change_magnitude,
                recommendation_text,
            }
        })
        .collect()
}
