//! Input instances
//!
//! An instance is an ordered, fixed-length numeric vector paired with a
//! parallel list of feature names. Instances are immutable once constructed;
//! every search candidate is an independent copy of the value vector.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single input instance to be explained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    values: Vec<f64>,
    feature_names: Vec<String>,
}

impl Instance {
    /// Create an instance from values and matching feature names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] when the two lists disagree
    /// in length.
    pub fn new(values: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if values.len() != feature_names.len() {
            return Err(Error::DimensionMismatch {
                expected: values.len(),
                got: feature_names.len(),
            });
        }
        Ok(Self { values, feature_names })
    }

    /// Create an instance from a raw vector, synthesizing feature names
    /// as `feature_0, feature_1, …`.
    pub fn from_values(values: Vec<f64>) -> Self {
        let feature_names = (0..values.len()).map(|i| format!("feature_{i}")).collect();
        Self { values, feature_names }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the instance has no features.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Feature values in order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Feature names in order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Name of the feature at `index`.
    pub fn name(&self, index: usize) -> &str {
        &self.feature_names[index]
    }
}
