use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::{ParamGen, param_gen::take};
use crate::Result;

/// Draws kernel weights from a distribution, sharing one rng with every other generator of a
/// model so that a single seed decides all of its parameters.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: Rc<RefCell<R>>,
    dist: D,
    remaining: usize,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen`.
    ///
    /// # Arguments
    /// * `rng` - The model's shared random number generator.
    /// * `dist` - The distribution of the weights.
    /// * `len` - How many weights it covers.
    pub fn new(rng: Rc<RefCell<R>>, dist: D, len: usize) -> Self {
        Self {
            rng,
            dist,
            remaining: len,
        }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f32>> {
    /// Glorot uniform weights, `U(-l, l)` with `l = sqrt(6 / (fan_in + fan_out))`.
    ///
    /// # Returns
    /// An error if both fans are zero, since the bound wouldn't be finite.
    pub fn glorot_uniform(
        rng: Rc<RefCell<R>>,
        len: usize,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<Self> {
        let bound = (6. / (fan_in + fan_out) as f32).sqrt();
        Ok(Self::new(rng, Uniform::new(-bound, bound)?, len))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        let n = take(&mut self.remaining, n)?;
        let mut rng = self.rng.borrow_mut();
        Some((&self.dist).sample_iter(&mut *rng).take(n).collect())
    }
}
