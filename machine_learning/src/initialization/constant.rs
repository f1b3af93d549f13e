use std::iter;

use super::{ParamGen, param_gen::take};

/// Fills a fixed amount of parameters with a single value, used for biases.
pub struct ConstParamGen {
    value: f32,
    remaining: usize,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen`.
    ///
    /// # Arguments
    /// * `value` - The value of every parameter.
    /// * `len` - How many parameters it covers.
    pub fn new(value: f32, len: usize) -> Self {
        Self {
            value,
            remaining: len,
        }
    }
}

impl ParamGen for ConstParamGen {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        take(&mut self.remaining, n).map(|n| iter::repeat_n(self.value, n).collect())
    }
}
