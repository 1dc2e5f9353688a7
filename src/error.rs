//! Engine error types

use thiserror::Error;

/// Errors surfaced by the counterfactual engine.
///
/// Only [`Error::UnknownMethod`] and [`Error::DimensionMismatch`] reach
/// callers of the orchestration entry point. Model failures on perturbed
/// candidates are caught, logged, and skipped inside the pipeline; a model
/// failure on the *original* instance is the one model error that
/// propagates, since nothing can be explained without a baseline prediction.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown optimization method: {0}")]
    UnknownMethod(String),

    #[error("Dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Model prediction failed: {0}")]
    Model(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownMethod("simulated_annealing".to_string());
        assert!(format!("{err}").contains("Unknown optimization method"));
        assert!(format!("{err}").contains("simulated_annealing"));

        let err = Error::DimensionMismatch { expected: 4, got: 3 };
        assert!(format!("{err}").contains("expected 4"));
        assert!(format!("{err}").contains("got 3"));

        let err = Error::Model("NaN input".to_string());
        assert!(format!("{err}").contains("Model prediction failed"));
    }
}
