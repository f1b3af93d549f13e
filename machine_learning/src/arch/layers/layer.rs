use ndarray::ArrayD;

use super::{Conv2d, Dense, Dropout, Fans, Flatten, MaxPool2d, Mode, Softmax};
use crate::{Result, arch::activations::ActFn};

/// Every kind of layer a `Sequential` can hold.
#[derive(Clone, Debug)]
pub enum Layer {
    Conv2d(Conv2d),
    MaxPool2d(MaxPool2d),
    Flatten(Flatten),
    Dense(Dense),
    Dropout(Dropout),
    Softmax(Softmax),
}

impl Layer {
    pub fn conv2d(
        in_channels: usize,
        filters: usize,
        kernel: (usize, usize),
        act_fn: Option<ActFn>,
    ) -> Self {
        Self::Conv2d(Conv2d::new(in_channels, filters, kernel, act_fn))
    }

    pub fn max_pool2d(pool: (usize, usize)) -> Self {
        Self::MaxPool2d(MaxPool2d::new(pool))
    }

    pub fn flatten() -> Self {
        Self::Flatten(Flatten::new())
    }

    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    pub fn dropout(rate: f32) -> Result<Self> {
        Ok(Self::Dropout(Dropout::new(rate)?))
    }

    pub fn softmax() -> Self {
        Self::Softmax(Softmax::new())
    }

    /// Returns the amount of parameters this layer reads from the model's parameter buffer.
    pub fn size(&self) -> usize {
        match self {
            Self::Conv2d(l) => l.size(),
            Self::Dense(l) => l.size(),
            _ => 0,
        }
    }

    /// Returns the fans of the layer's kernel, `None` for layers without parameters.
    pub fn fans(&self) -> Option<Fans> {
        match self {
            Self::Conv2d(l) => Some(l.fans()),
            Self::Dense(l) => Some(l.fans()),
            _ => None,
        }
    }

    /// Computes the per-sample output shape for a per-sample `input` shape, `None` if the layer
    /// can't take that input.
    pub fn output_shape(&self, input: &[usize]) -> Option<Vec<usize>> {
        match self {
            Self::Conv2d(l) => l.output_shape(input),
            Self::MaxPool2d(l) => l.output_shape(input),
            Self::Flatten(l) => l.output_shape(input),
            Self::Dense(l) => l.output_shape(input),
            Self::Dropout(_) | Self::Softmax(_) => Some(input.to_vec()),
        }
    }

    /// Restarts any randomness the layer draws from during training.
    pub fn reseed(&mut self, seed: u64) {
        if let Self::Dropout(l) = self {
            l.reseed(seed);
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>, mode: Mode) -> Result<ArrayD<f32>> {
        match self {
            Self::Conv2d(l) => l.forward(params, x),
            Self::MaxPool2d(l) => l.forward(x),
            Self::Flatten(l) => l.forward(x),
            Self::Dense(l) => l.forward(params, x),
            Self::Dropout(l) => l.forward(x, mode),
            Self::Softmax(l) => l.forward(x),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        match self {
            Self::Conv2d(l) => l.backward(params, grad, d),
            Self::MaxPool2d(l) => l.backward(d),
            Self::Flatten(l) => l.backward(d),
            Self::Dense(l) => l.backward(params, grad, d),
            Self::Dropout(l) => l.backward(d),
            Self::Softmax(l) => l.backward(d),
        }
    }
}
