use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::Result;

/// A loss over a batch of predictions `(n, classes)` against integer class labels `(n,)`.
pub trait LossFn {
    /// Returns the mean loss over the batch.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView1<usize>) -> Result<f32>;

    /// Returns the derivative of the mean loss with respect to every prediction.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView1<usize>) -> Result<Array2<f32>>;
}
