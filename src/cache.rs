//! Best-effort result cache
//!
//! An optional, host-owned cache keyed by (instance, request) fingerprint.
//! The engine itself never consults it — every call stays a pure function —
//! but a host serving repeated identical explanation requests can check it
//! before invoking the engine. Best-effort only: no single-flight or
//! at-most-once semantics; a host wrapping concurrent identical requests
//! must add its own deduplication.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::engine::{CounterfactualRequest, ExplanationResult};
use crate::instance::Instance;

/// Fixed-capacity map from request fingerprints to explanation results.
/// Insertion past capacity evicts an arbitrary entry.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<u64, ExplanationResult>,
    capacity: usize,
}

impl ResultCache {
    /// Cache holding at most `capacity` results (0 means unbounded).
    pub fn new(capacity: usize) -> Self {
        Self { entries: HashMap::new(), capacity }
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a cached result for this (instance, request) pair.
    pub fn get(
        &self,
        instance: &Instance,
        request: &CounterfactualRequest,
    ) -> Option<&ExplanationResult> {
        self.entries.get(&fingerprint(instance, request))
    }

    /// Store a result for this (instance, request) pair.
    pub fn insert(
        &mut self,
        instance: &Instance,
        request: &CounterfactualRequest,
        result: ExplanationResult,
    ) {
        if self.capacity > 0 && self.entries.len() >= self.capacity {
            if let Some(&victim) = self.entries.keys().next() {
                self.entries.remove(&victim);
            }
        }
        self.entries.insert(fingerprint(instance, request), result);
    }

    /// Drop all cached results.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Stable fingerprint of instance values/names plus the request parameters.
/// Constraint overrides are hashed in sorted key order so two equal requests
/// always collide.
fn fingerprint(instance: &Instance, request: &CounterfactualRequest) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for &v in instance.values() {
        v.to_bits().hash(&mut hasher);
    }
    for name in instance.feature_names() {
        name.hash(&mut hasher);
    }

    if let Ok(encoded) = serde_json::to_string(&request.desired_outcome) {
        encoded.hash(&mut hasher);
    }
    request.method.name().hash(&mut hasher);
    request.metric.name().hash(&mut hasher);
    request.max_changes.hash(&mut hasher);
    request.n_counterfactuals.hash(&mut hasher);

    let mut names: Vec<&String> = request.constraints.keys().collect();
    names.sort();
    for name in names {
        name.hash(&mut hasher);
        let ov = &request.constraints[name];
        ov.min.map(f64::to_bits).hash(&mut hasher);
        ov.max.map(f64::to_bits).hash(&mut hasher);
        ov.mutable.hash(&mut hasher);
    }
    hasher.finish()
}
