//! Constraint preparation
//!
//! The first pipeline stage derives, per feature, a mutable/immutable flag
//! and an inclusive `[min, max]` range. Caller-supplied overrides are used
//! verbatim; everything else gets the default heuristic of ±50% around the
//! current value, with the bounds ordered so `min <= max` regardless of
//! sign. Constraints are immutable value types after preparation: the three
//! search strategies only ever read them.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::instance::Instance;

/// Mutability and range for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureConstraint {
    /// When false, the feature must never differ from the original value.
    pub mutable: bool,
    /// Inclusive lower bound for a mutable feature.
    pub min: f64,
    /// Inclusive upper bound for a mutable feature.
    pub max: f64,
}

impl FeatureConstraint {
    /// A mutable constraint over `[min, max]`.
    pub fn bounded(min: f64, max: f64) -> Self {
        Self { mutable: true, min, max }
    }

    /// An immutable constraint pinned to `value`.
    pub fn immutable(value: f64) -> Self {
        Self { mutable: false, min: value, max: value }
    }

    /// Default constraint for a feature currently at `value`: mutable, with
    /// a range spanning `0.5·value` to `1.5·value`, bounds ordered. A value
    /// of exactly zero yields the degenerate range `[0, 0]`, pinning the
    /// feature unless an override widens it.
    pub fn default_for(value: f64) -> Self {
        let (a, b) = (0.5 * value, 1.5 * value);
        Self { mutable: true, min: a.min(b), max: a.max(b) }
    }

    /// Clip `v` into the range. Written without `f64::clamp` so a
    /// caller-supplied inverted range (`min > max`) collapses to `max`
    /// instead of panicking.
    pub fn clip(&self, v: f64) -> f64 {
        v.max(self.min).min(self.max)
    }

    /// Sample a uniform value within the range.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        self.min + rng.random::<f64>() * (self.max - self.min)
    }

    /// Width of the range (zero for pinned or inverted ranges).
    pub fn span(&self) -> f64 {
        (self.max - self.min).max(0.0)
    }
}

/// Partial per-feature override supplied by the caller, keyed by feature
/// name. Missing fields fall back to the default heuristic. Supplied bounds
/// are trusted verbatim, inverted or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintOverride {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mutable: Option<bool>,
}

impl ConstraintOverride {
    /// Shorthand for an immutable override.
    pub fn immutable() -> Self {
        Self { min: None, max: None, mutable: Some(false) }
    }

    /// Shorthand for a mutable range override.
    pub fn range(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max), mutable: Some(true) }
    }
}

/// Prepared constraints for every feature of an instance, indexed by
/// feature position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    constraints: Vec<FeatureConstraint>,
}

impl ConstraintSet {
    /// Derive constraints for `instance`, merging caller overrides (keyed by
    /// feature name) over the default heuristic. Override names that match
    /// no feature are ignored.
    pub fn prepare(
        overrides: &HashMap<String, ConstraintOverride>,
        instance: &Instance,
    ) -> Self {
        let constraints = instance
            .values()
            .iter()
            .zip(instance.feature_names())
            .map(|(&value, name)| {
                let default = FeatureConstraint::default_for(value);
                match overrides.get(name) {
                    Some(ov) => FeatureConstraint {
                        mutable: ov.mutable.unwrap_or(default.mutable),
                        min: ov.min.unwrap_or(default.min),
                        max: ov.max.unwrap_or(default.max),
                    },
                    None => default,
                }
            })
            .collect();
        Self { constraints }
    }

    /// Constraint for the feature at `index`.
    pub fn get(&self, index: usize) -> &FeatureConstraint {
        &self.constraints[index]
    }

    /// Number of features covered.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// True when no features are covered.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Indices of all mutable features, in feature order.
    pub fn mutable_indices(&self) -> Vec<usize> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| c.mutable)
            .map(|(i, _)| i)
            .collect()
    }

    /// Iterate over per-feature constraints in order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureConstraint> {
        self.constraints.iter()
    }
}
