//! Opaque model interface
//!
//! The model under explanation is the engine's only required collaborator.
//! It is exposed purely through batch prediction: `predict` over a 2-D batch
//! of instances, and optionally `predict_proba` for per-class probability
//! vectors. A model that does not expose probabilities degrades the
//! probability-aware logic (default-outcome resolution falls back to the
//! regression policy, and results carry no probability vectors).

use ndarray::{Array1, Array2, ArrayView2};

use crate::error::Result;

/// Trait for models that can be explained.
///
/// `batch` has shape `[k, n_features]`; `predict` returns one scalar per
/// row (class index for classifiers, value for regressors).
pub trait Model {
    /// Predict outcomes for a batch of instances.
    fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Array1<f64>>;

    /// Predict per-class probabilities for a batch, shape `[k, n_classes]`.
    ///
    /// Returns `Ok(None)` when the model does not expose probabilities.
    fn predict_proba(&self, _batch: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>> {
        Ok(None)
    }
}

/// Adapter turning a per-row closure into a [`Model`].
///
/// Convenient for tests and for wrapping simple scoring functions:
///
/// ```
/// use explicar::{FnModel, Model};
/// use ndarray::array;
///
/// let model = FnModel::new(|x: &[f64]| if x[0] > 0.5 { 1.0 } else { 0.0 });
/// let preds = model.predict(array![[0.2, 0.9], [0.8, 0.1]].view()).unwrap();
/// assert_eq!(preds.to_vec(), vec![0.0, 1.0]);
/// ```
pub struct FnModel<F> {
    predict_fn: F,
}

impl<F> FnModel<F>
where
    F: Fn(&[f64]) -> f64,
{
    /// Wrap a per-row prediction function.
    pub fn new(predict_fn: F) -> Self {
        Self { predict_fn }
    }
}

impl<F> Model for FnModel<F>
where
    F: Fn(&[f64]) -> f64,
{
    fn predict(&self, batch: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let out: Vec<f64> = batch
            .rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                (self.predict_fn)(&row)
            })
            .collect();
        Ok(Array1::from_vec(out))
    }
}
