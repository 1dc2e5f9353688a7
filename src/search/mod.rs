//! Candidate generation strategies
//!
//! Three interchangeable search strategies produce raw candidate instances:
//! gradient descent over finite differences, a genetic algorithm, and
//! constrained random search. All share one contract: respect the prepared
//! constraints and the max-changes budget, never return the original
//! instance, and return between zero and `n_candidates` candidates —
//! exhausting the attempt budget short of the quota is not an error.
//!
//! Dispatch is a closed enum matched exhaustively; an unrecognized method
//! name fails fast at the string-parsing boundary.

pub mod genetic;
pub mod gradient;
pub mod random;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintSet;
use crate::engine::Oracle;
use crate::error::Error;
use crate::evaluate::vectors_close;
use crate::instance::Instance;
use crate::outcome::DesiredOutcome;

/// Available search strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMethod {
    GradientDescent,
    Genetic,
    RandomSearch,
}

impl Default for OptimizationMethod {
    fn default() -> Self {
        OptimizationMethod::GradientDescent
    }
}

impl OptimizationMethod {
    /// Canonical method name.
    pub fn name(&self) -> &'static str {
        match self {
            OptimizationMethod::GradientDescent => "gradient_based",
            OptimizationMethod::Genetic => "genetic_algorithm",
            OptimizationMethod::RandomSearch => "random_search",
        }
    }
}

impl FromStr for OptimizationMethod {
    type Err = Error;

    /// Parse a method name. Unlike distance metrics, an unrecognized name
    /// is a configuration error, not a fallback.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gradient_based" | "gradient" => Ok(OptimizationMethod::GradientDescent),
            "genetic_algorithm" | "genetic" => Ok(OptimizationMethod::Genetic),
            "random_search" | "random" => Ok(OptimizationMethod::RandomSearch),
            other => Err(Error::UnknownMethod(other.to_string())),
        }
    }
}

/// Named tunables for all three strategies; every knob is overridable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBudget {
    /// Maximum iterations per gradient attempt.
    pub gradient_iterations: usize,
    /// Gradient step size.
    pub learning_rate: f64,
    /// Forward finite-difference epsilon.
    pub gradient_epsilon: f64,
    /// Step L2 norm below which a gradient attempt is considered converged.
    pub convergence_threshold: f64,
    /// Fraction of each feature's range used to jitter gradient starts.
    pub init_jitter: f64,
    /// Genetic population size.
    pub population_size: usize,
    /// Genetic generation budget.
    pub generations: usize,
    /// Per-offspring single-feature mutation probability.
    pub mutation_rate: f64,
    /// Fraction of the population carried unchanged as elites.
    pub elite_fraction: f64,
    /// Random-search attempt budget.
    pub random_attempts: usize,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            gradient_iterations: 100,
            learning_rate: 0.01,
            gradient_epsilon: 1e-4,
            convergence_threshold: 1e-6,
            init_jitter: 0.05,
            population_size: 50,
            generations: 100,
            mutation_rate: 0.1,
            elite_fraction: 0.25,
            random_attempts: 1000,
        }
    }
}

/// Named weights of the genetic fitness function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessWeights {
    /// Weight of the 0/1 outcome term.
    pub outcome: f64,
    /// Weight of `1 / (1 + L2 distance)`.
    pub proximity: f64,
    /// Weight of `1 / (1 + changed feature count)`.
    pub sparsity: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self { outcome: 0.6, proximity: 0.3, sparsity: 0.1 }
    }
}

/// Read-only context shared by every strategy during one explanation
/// request.
pub(crate) struct SearchContext<'a> {
    pub oracle: &'a Oracle<'a>,
    pub instance: &'a Instance,
    pub constraints: &'a ConstraintSet,
    pub desired: DesiredOutcome,
    pub max_changes: usize,
    pub n_candidates: usize,
    pub budget: &'a SearchBudget,
    pub fitness: &'a FitnessWeights,
    pub cancel: Option<&'a AtomicBool>,
}

impl SearchContext<'_> {
    /// Cooperative cancellation, checked at iteration and generation
    /// boundaries.
    pub fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Whether `candidate` is a near-duplicate of any accepted candidate.
    pub fn is_duplicate(&self, candidate: &[f64], accepted: &[Vec<f64>]) -> bool {
        accepted.iter().any(|a| vectors_close(a, candidate))
    }

    /// Whether `candidate` meaningfully differs from the original instance.
    pub fn differs_from_original(&self, candidate: &[f64]) -> bool {
        !vectors_close(candidate, self.instance.values())
    }
}
