mod conv;
mod dense;
mod dropout;
mod flatten;
mod layer;
mod pool;
mod softmax;

use ndarray::ArrayD;

pub use conv::Conv2d;
pub use dense::Dense;
pub use dropout::Dropout;
pub use flatten::Flatten;
pub use layer::Layer;
pub use pool::MaxPool2d;
pub use softmax::Softmax;

/// Whether a forward pass is part of training or of inference.
///
/// Only layers that behave differently while training, like `Dropout`, look at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Train,
    Infer,
}

/// The fan sizes and parameter split of a layer's kernel, used to initialize it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fans {
    pub fan_in: usize,
    pub fan_out: usize,
    pub weights: usize,
    pub biases: usize,
}

/// Makes sure `a` is laid out in row-major order so it can be reshaped without copying twice.
pub(crate) fn standard(a: ArrayD<f32>) -> ArrayD<f32> {
    if a.is_standard_layout() {
        a
    } else {
        a.as_standard_layout().into_owned()
    }
}
