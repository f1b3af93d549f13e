use ndarray::{ArrayD, ArrayView1, Ix2};

use super::{layers::Mode, loss::LossFn};
use crate::{Result, metrics::{self, BatchMetrics}};

pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Makes a forward pass through the model.
    ///
    /// # Arguments
    /// * `params` - The model's parameters, `size()` of them.
    /// * `x` - A batch of inputs.
    /// * `mode` - Whether the pass is part of training.
    ///
    /// # Returns
    /// The model's output for the batch.
    fn forward(&mut self, params: &[f32], x: ArrayD<f32>, mode: Mode) -> Result<ArrayD<f32>>;

    /// Propagates `d`, the derivative of the loss with respect to the output of the last forward
    /// pass, back through the model, **overwriting** `grad` with the gradient of the parameters.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: ArrayD<f32>) -> Result<()>;

    /// Restarts the randomness the model uses while training.
    fn reseed(&mut self, seed: u64);

    /// Computes the gradient of the loss over a single batch.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer where the gradient of the batch gets written.
    /// * `loss_fn` - The loss function.
    /// * `x` - The batch inputs.
    /// * `y` - The batch labels.
    ///
    /// # Returns
    /// The metrics of the batch, measured on the training forward pass.
    fn backprop<L: LossFn>(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        loss_fn: &L,
        x: ArrayD<f32>,
        y: ArrayView1<usize>,
    ) -> Result<BatchMetrics> {
        let y_pred = self.forward(params, x, Mode::Train)?.into_dimensionality::<Ix2>()?;

        let loss = loss_fn.loss(y_pred.view(), y)?;
        let correct = metrics::correct_predictions(y_pred.view(), y);
        let d = loss_fn.loss_prime(y_pred.view(), y)?;

        self.backward(params, grad, d.into_dyn())?;
        Ok(BatchMetrics::new(loss, correct, y.len()))
    }

    /// Measures the model on a single batch without training it.
    fn evaluate<L: LossFn>(
        &mut self,
        params: &[f32],
        loss_fn: &L,
        x: ArrayD<f32>,
        y: ArrayView1<usize>,
    ) -> Result<BatchMetrics> {
        let y_pred = self.forward(params, x, Mode::Infer)?.into_dimensionality::<Ix2>()?;

        let loss = loss_fn.loss(y_pred.view(), y)?;
        let correct = metrics::correct_predictions(y_pred.view(), y);
        Ok(BatchMetrics::new(loss, correct, y.len()))
    }
}
