use ndarray::{Array2, ArrayView1, ArrayView2};

use super::LossFn;
use crate::{MlErr, Result};

/// Sparse categorical cross-entropy over probabilities (the output of a softmax), with integer
/// labels instead of one-hot targets.
///
/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` to keep the logarithm finite.
#[derive(Default, Clone, Copy, Debug)]
pub struct SparseCategoricalCrossentropy;

impl SparseCategoricalCrossentropy {
    pub const EPSILON: f32 = 1e-7;

    /// Returns a new `SparseCategoricalCrossentropy`.
    pub fn new() -> Self {
        Self
    }

    fn check(y_pred: &ArrayView2<f32>, y: &ArrayView1<usize>) -> Result<()> {
        let (n, classes) = y_pred.dim();

        if y.len() != n {
            return Err(MlErr::SizeMismatch {
                what: "labels",
                got: y.len(),
                expected: n,
            });
        }

        if let Some(&label) = y.iter().find(|&&label| label >= classes) {
            return Err(MlErr::SizeMismatch {
                what: "label classes",
                got: label + 1,
                expected: classes,
            });
        }

        Ok(())
    }

    fn clip(p: f32) -> f32 {
        p.clamp(Self::EPSILON, 1. - Self::EPSILON)
    }
}

impl LossFn for SparseCategoricalCrossentropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView1<usize>) -> Result<f32> {
        Self::check(&y_pred, &y)?;

        if y.is_empty() {
            return Ok(0.);
        }

        let total: f32 = y_pred
            .rows()
            .into_iter()
            .zip(y.iter())
            .map(|(row, &label)| -Self::clip(row[label]).ln())
            .sum();

        Ok(total / y.len() as f32)
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView1<usize>) -> Result<Array2<f32>> {
        Self::check(&y_pred, &y)?;

        let n = y.len() as f32;
        let mut d = Array2::zeros(y_pred.raw_dim());

        for (i, &label) in y.iter().enumerate() {
            d[[i, label]] = -1. / (Self::clip(y_pred[[i, label]]) * n);
        }

        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn loss_is_the_mean_negative_log_likelihood() {
        let loss_fn = SparseCategoricalCrossentropy::new();
        let y_pred = array![[0.5, 0.25, 0.25], [0.1, 0.8, 0.1]];
        let y = array![0, 1];

        let loss = loss_fn.loss(y_pred.view(), y.view()).unwrap();
        let expected = -(0.5f32.ln() + 0.8f32.ln()) / 2.;
        assert!((loss - expected).abs() < 1e-6);
    }

    #[test]
    fn confident_mistakes_stay_finite() {
        let loss_fn = SparseCategoricalCrossentropy::new();
        let y_pred = array![[1., 0.]];

        let loss = loss_fn.loss(y_pred.view(), array![1].view()).unwrap();
        assert!(loss.is_finite());
        assert!((loss - -(1e-7f32).ln()).abs() < 1e-3);
    }

    #[test]
    fn derivative_only_touches_the_true_class() {
        let loss_fn = SparseCategoricalCrossentropy::new();
        let y_pred = array![[0.5, 0.5], [0.25, 0.75]];

        let d = loss_fn.loss_prime(y_pred.view(), array![1, 0].view()).unwrap();
        assert_eq!(d, array![[0f32, -1.], [-2., 0.]]);
    }

    #[test]
    fn out_of_range_labels_are_rejected() {
        let loss_fn = SparseCategoricalCrossentropy::new();
        let y_pred = array![[0.5, 0.5]];

        assert!(loss_fn.loss(y_pred.view(), array![2].view()).is_err());
        assert!(loss_fn.loss(y_pred.view(), array![0, 1].view()).is_err());
    }
}
