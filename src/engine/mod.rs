//! Counterfactual engine orchestration
//!
//! The engine wires the pipeline together: prepare constraints, resolve the
//! desired outcome, dispatch the chosen search strategy, evaluate and rank
//! its candidates, then synthesize insights and feasibility. It is
//! stateless across calls; every run is a pure function of
//! (model, instance, request). Hosts wanting request-level concurrency can
//! run independent calls on separate tasks or threads.
//!
//! Failure surface: finding zero counterfactuals is a well-formed empty
//! result, never an error. Model failures on perturbed candidates are
//! logged and skipped; only a failure on the original instance propagates,
//! since nothing can be explained without a baseline prediction.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::constraints::{ConstraintOverride, ConstraintSet};
use crate::error::{Error, Result};
use crate::evaluate::{self, DistanceMetric, EvaluatedCounterfactual};
use crate::insight::{
    self, ActionabilityPolicy, ActionableInsight, FeasibilitySummary, FeasibilityWeights,
};
use crate::instance::Instance;
use crate::model::Model;
use crate::outcome::DesiredOutcome;
use crate::search::{
    self, FitnessWeights, OptimizationMethod, SearchBudget, SearchContext,
};

/// Engine-level configuration: reproducibility, budgets, and the heuristic
/// policies behind insight synthesis.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seed for the search strategies' random number generator.
    pub seed: u64,
    pub budget: SearchBudget,
    pub fitness: FitnessWeights,
    pub feasibility: FeasibilityWeights,
    pub actionability: ActionabilityPolicy,
    /// How many top features to keep as actionable insights.
    pub top_insights: usize,
    /// Optional hard cap on model invocations per explanation request.
    /// When exhausted, searches degrade gracefully and return what they
    /// have.
    pub max_model_calls: Option<usize>,
    /// Optional cooperative cancellation flag, checked at iteration and
    /// generation boundaries.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            budget: SearchBudget::default(),
            fitness: FitnessWeights::default(),
            feasibility: FeasibilityWeights::default(),
            actionability: ActionabilityPolicy::default(),
            top_insights: 5,
            max_model_calls: None,
            cancel: None,
        }
    }
}

/// Per-request parameters for one explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterfactualRequest {
    /// Outcome to drive toward; resolved from the model's own prediction
    /// when absent.
    pub desired_outcome: Option<DesiredOutcome>,
    /// Maximum number of features a candidate may change.
    pub max_changes: usize,
    pub method: OptimizationMethod,
    pub metric: DistanceMetric,
    /// Per-feature-name constraint overrides; unlisted features get the
    /// ±50% default heuristic.
    pub constraints: HashMap<String, ConstraintOverride>,
    /// How many counterfactuals to aim for; fewer (possibly zero) is valid.
    pub n_counterfactuals: usize,
}

impl Default for CounterfactualRequest {
    fn default() -> Self {
        Self {
            desired_outcome: None,
            max_changes: 3,
            method: OptimizationMethod::default(),
            metric: DistanceMetric::default(),
            constraints: HashMap::new(),
            n_counterfactuals: 3,
        }
    }
}

/// How a result was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Canonical method name.
    pub method: String,
    pub elapsed_ms: f64,
    pub timestamp: DateTime<Utc>,
    /// Counterfactuals produced.
    pub n_produced: usize,
    /// Total model invocations spent (one per predicted row).
    pub model_calls: usize,
}

/// Complete output of one explanation request. JSON-serializable end to
/// end; an empty `counterfactuals` list with zeroed feasibility is the
/// well-formed "nothing found" outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub original_instance: Instance,
    pub original_prediction: f64,
    pub original_probabilities: Option<Vec<f64>>,
    pub desired_outcome: DesiredOutcome,
    /// Ranked descending by proximity score.
    pub counterfactuals: Vec<EvaluatedCounterfactual>,
    pub actionable_insights: Vec<ActionableInsight>,
    pub feasibility_scores: FeasibilitySummary,
    pub metadata: GenerationMetadata,
}

/// Engine-private model wrapper: counts invocations, enforces the optional
/// call cap, and converts per-candidate model failures into logged skips.
pub(crate) struct Oracle<'a> {
    model: &'a dyn Model,
    calls: Cell<usize>,
    max_calls: Option<usize>,
}

impl<'a> Oracle<'a> {
    pub fn new(model: &'a dyn Model, max_calls: Option<usize>) -> Self {
        Self { model, calls: Cell::new(0), max_calls }
    }

    /// Model invocations spent so far (one per predicted row).
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Whether the call cap has been reached.
    pub fn exhausted(&self) -> bool {
        self.max_calls.is_some_and(|cap| self.calls.get() >= cap)
    }

    /// Charge `k` calls against the cap; false when it would exceed.
    fn charge(&self, k: usize) -> bool {
        match self.max_calls {
            Some(cap) if self.calls.get() + k > cap => {
                log::debug!("model call budget exhausted ({cap} calls)");
                false
            }
            _ => {
                self.calls.set(self.calls.get() + k);
                true
            }
        }
    }

    /// Predict a single instance, propagating failures. Used for the
    /// baseline prediction, which the whole request depends on.
    pub fn predict_one_strict(&self, x: &[f64]) -> Result<f64> {
        if !self.charge(1) {
            return Err(Error::Model(
                "model call budget exhausted before baseline prediction".into(),
            ));
        }
        let view = ArrayView2::from_shape((1, x.len()), x)
            .map_err(|e| Error::Model(e.to_string()))?;
        let out = self.model.predict(view)?;
        out.first()
            .copied()
            .ok_or_else(|| Error::Model("empty prediction for original instance".into()))
    }

    /// Predict a single instance; `None` on budget exhaustion or model
    /// failure (logged).
    pub fn predict_one(&self, x: &[f64]) -> Option<f64> {
        if !self.charge(1) {
            return None;
        }
        let view = ArrayView2::from_shape((1, x.len()), x).ok()?;
        match self.model.predict(view) {
            Ok(out) if out.len() == 1 => Some(out[0]),
            Ok(out) => {
                log::warn!("model returned {} predictions for 1 instance", out.len());
                None
            }
            Err(e) => {
                log::warn!("model prediction failed on candidate: {e}");
                None
            }
        }
    }

    /// Predict a batch of equal-length rows; `None` on budget exhaustion
    /// or model failure (logged).
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Option<Vec<f64>> {
        if rows.is_empty() {
            return Some(Vec::new());
        }
        if !self.charge(rows.len()) {
            return None;
        }
        let width = rows[0].len();
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let batch = Array2::from_shape_vec((rows.len(), width), flat).ok()?;
        match self.model.predict(batch.view()) {
            Ok(out) if out.len() == rows.len() => Some(out.to_vec()),
            Ok(out) => {
                log::warn!(
                    "model returned {} predictions for {} instances",
                    out.len(),
                    rows.len()
                );
                None
            }
            Err(e) => {
                log::warn!("model batch prediction failed: {e}");
                None
            }
        }
    }

    /// Probability vector for a single instance; `None` when the model does
    /// not expose probabilities, fails, or the budget is exhausted.
    pub fn proba_one(&self, x: &[f64]) -> Option<Vec<f64>> {
        if !self.charge(1) {
            return None;
        }
        let view = ArrayView2::from_shape((1, x.len()), x).ok()?;
        match self.model.predict_proba(view) {
            Ok(Some(probs)) if probs.nrows() == 1 => Some(probs.row(0).to_vec()),
            Ok(_) => None,
            Err(e) => {
                log::warn!("predict_proba failed on candidate: {e}");
                None
            }
        }
    }
}

/// The counterfactual explanation engine.
///
/// See the crate-level docs for an end-to-end example.
#[derive(Debug, Clone, Default)]
pub struct CounterfactualEngine {
    config: EngineConfig,
}

impl CounterfactualEngine {
    /// Engine with explicit configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate counterfactual explanations for `instance` under `model`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Model`] only when the model fails on the original
    /// instance. Finding no counterfactual is not an error.
    pub fn generate_counterfactuals(
        &self,
        model: &dyn Model,
        instance: &Instance,
        request: &CounterfactualRequest,
    ) -> Result<ExplanationResult> {
        let start = Instant::now();
        let oracle = Oracle::new(model, self.config.max_model_calls);

        let original_prediction = oracle.predict_one_strict(instance.values())?;
        let original_probabilities = oracle.proba_one(instance.values());

        let desired = request.desired_outcome.unwrap_or_else(|| {
            DesiredOutcome::resolve_default(
                original_prediction,
                original_probabilities.as_deref(),
            )
        });

        let constraints = ConstraintSet::prepare(&request.constraints, instance);

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let ctx = SearchContext {
            oracle: &oracle,
            instance,
            constraints: &constraints,
            desired,
            max_changes: request.max_changes,
            n_candidates: request.n_counterfactuals,
            budget: &self.config.budget,
            fitness: &self.config.fitness,
            cancel: self.config.cancel.as_deref(),
        };
        let candidates = match request.method {
            OptimizationMethod::GradientDescent => search::gradient::generate(&ctx, &mut rng),
            OptimizationMethod::Genetic => search::genetic::generate(&ctx, &mut rng),
            OptimizationMethod::RandomSearch => search::random::generate(&ctx, &mut rng),
        };

        let counterfactuals = evaluate::evaluate_candidates(
            &oracle,
            instance,
            candidates,
            desired,
            request.metric,
        );

        let actionable_insights = insight::derive_insights(
            &counterfactuals,
            &self.config.actionability,
            self.config.top_insights,
        );
        let feasibility_scores = insight::feasibility_summary(
            &counterfactuals,
            &self.config.feasibility,
            &self.config.actionability,
        );

        Ok(ExplanationResult {
            original_instance: instance.clone(),
            original_prediction,
            original_probabilities,
            desired_outcome: desired,
            metadata: GenerationMetadata {
                method: request.method.name().to_string(),
                elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
                timestamp: Utc::now(),
                n_produced: counterfactuals.len(),
                model_calls: oracle.calls(),
            },
            counterfactuals,
            actionable_insights,
            feasibility_scores,
        })
    }
}
