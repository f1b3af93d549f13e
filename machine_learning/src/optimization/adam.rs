use ndarray::{ArrayView1, ArrayViewMut1, Zip};

use super::Optimizer;
use crate::{MlErr, Result};

/// Adam, keeping the first and second moment estimates of every parameter.
///
/// The bias corrections of both moments are applied to the step size instead of the moments.
#[derive(Debug)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    m: Vec<f32>,
    v: Vec<f32>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance, or an error if a hyperparameter is out of range.
    pub fn new(
        len: usize,
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    ) -> Result<Self> {
        let checks = [
            ("learning rate", learning_rate, learning_rate > 0.),
            ("beta1", beta1, (0.0..1.0).contains(&beta1)),
            ("beta2", beta2, (0.0..1.0).contains(&beta2)),
            ("epsilon", epsilon, epsilon > 0.),
        ];

        if let Some(&(name, value, _)) = checks.iter().find(|(_, _, ok)| !ok) {
            return Err(MlErr::InvalidHyperparameter { name, value });
        }

        Ok(Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: vec![0.; len],
            v: vec![0.; len],
        })
    }

    /// Creates a new `Adam` optimizer with the usual defaults, `beta1 = 0.9`, `beta2 = 0.999`
    /// and `epsilon = 1e-7`.
    pub fn with_learning_rate(len: usize, learning_rate: f32) -> Result<Self> {
        Self::new(len, learning_rate, 0.9, 0.999, 1e-7)
    }

    /// The step size of the current update, `lr * sqrt(1 - beta2^t) / (1 - beta1^t)`.
    fn step_size(&self) -> f32 {
        let bc1 = 1. - self.beta1.powi(self.t);
        let bc2 = 1. - self.beta2.powi(self.t);
        self.learning_rate * bc2.sqrt() / bc1
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        let len = self.m.len();

        for (what, got) in [("gradient", grad.len()), ("parameters", params.len())] {
            if got != len {
                return Err(MlErr::SizeMismatch {
                    what,
                    got,
                    expected: len,
                });
            }
        }

        self.t = self.t.saturating_add(1);
        let step_size = self.step_size();
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);

        Zip::from(ArrayViewMut1::from(params))
            .and(ArrayView1::from(grad))
            .and(ArrayViewMut1::from(&mut self.m[..]))
            .and(ArrayViewMut1::from(&mut self.v[..]))
            .for_each(|p, &g, m, v| {
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g * g;
                *p -= step_size * *m / (v.sqrt() + eps);
            });

        Ok(())
    }
}
