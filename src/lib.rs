//! Explicar: counterfactual explanations for opaque models
//!
//! Given a trained classifier or regressor and an input instance, `explicar`
//! searches for the minimal, actionable perturbation of that instance that
//! flips the model's prediction to a desired outcome, under per-feature
//! mutability and range constraints.
//!
//! ## Architecture
//!
//! The engine is a forward pipeline of four stages:
//!
//! - `constraints`: derives a mutable flag and `[min, max]` range per feature
//! - `search`: produces candidate instances via one of three strategies
//!   (gradient descent on finite differences, genetic, random search)
//! - `evaluate`: scores candidates (changes, distance, sparsity, proximity)
//! - `insight`: aggregates ranked counterfactuals into per-feature
//!   recommendations and a feasibility summary
//!
//! The model under explanation is opaque: anything implementing [`Model`]
//! (batch `predict`, optional `predict_proba`) can be explained. The engine
//! holds no state across calls; every run is a pure function of
//! (model, instance, request).
//!
//! ## Example
//!
//! ```
//! use explicar::{
//!     CounterfactualEngine, CounterfactualRequest, FnModel, Instance, OptimizationMethod,
//! };
//!
//! # fn main() -> explicar::Result<()> {
//! let model = FnModel::new(|x: &[f64]| x.iter().sum());
//! let instance = Instance::from_values(vec![1.0, 2.0]);
//!
//! let request = CounterfactualRequest {
//!     method: OptimizationMethod::RandomSearch,
//!     ..Default::default()
//! };
//!
//! let engine = CounterfactualEngine::default();
//! let result = engine.generate_counterfactuals(&model, &instance, &request)?;
//!
//! assert_eq!(result.original_prediction, 3.0);
//! assert!(result.counterfactuals.len() <= request.n_counterfactuals);
//! # Ok(())
//! # }
//! ```
//!
//! A search that exhausts its budget without finding a counterfactual is not
//! an error: the result comes back well-formed with empty lists and a zeroed
//! feasibility summary.

pub mod cache;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod insight;
pub mod instance;
pub mod model;
pub mod outcome;
pub mod search;

pub use cache::ResultCache;
pub use constraints::{ConstraintOverride, ConstraintSet, FeatureConstraint};
pub use engine::{
    CounterfactualEngine, CounterfactualRequest, EngineConfig, ExplanationResult,
    GenerationMetadata,
};
pub use error::{Error, Result};
pub use evaluate::{ChangeDirection, DistanceMetric, EvaluatedCounterfactual, FeatureChange};
pub use insight::{
    ActionabilityPolicy, ActionableInsight, FeasibilitySummary, FeasibilityWeights,
};
pub use instance::Instance;
pub use model::{FnModel, Model};
pub use outcome::DesiredOutcome;
pub use search::{FitnessWeights, OptimizationMethod, SearchBudget};
