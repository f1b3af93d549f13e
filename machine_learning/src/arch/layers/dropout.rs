use ndarray::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::Mode;
use crate::{MlErr, Result};

/// Zeroes each input with probability `rate` while training, scaling the survivors by
/// `1 / (1 - rate)` so that the expected activation is unchanged. Inference is the identity.
#[derive(Clone, Debug)]
pub struct Dropout {
    rate: f32,
    rng: StdRng,

    // Forward metadata
    mask: Option<ArrayD<f32>>,
}

impl Dropout {
    /// Creates a new `Dropout` layer.
    ///
    /// # Arguments
    /// * `rate` - The probability of dropping each input, in `[0, 1)`.
    ///
    /// # Returns
    /// A new `Dropout` instance or an error if `rate` is out of range.
    pub fn new(rate: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&rate) {
            return Err(MlErr::InvalidHyperparameter {
                name: "dropout rate",
                value: rate,
            });
        }

        Ok(Self {
            rate,
            rng: StdRng::seed_from_u64(0),
            mask: None,
        })
    }

    /// Restarts the mask generator from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn forward(&mut self, x: ArrayD<f32>, mode: Mode) -> Result<ArrayD<f32>> {
        if mode == Mode::Infer || self.rate == 0.0 {
            self.mask = None;
            return Ok(x);
        }

        let keep = 1.0 - self.rate;
        let scale = 1.0 / keep;
        let mask = ArrayD::from_shape_simple_fn(x.raw_dim(), || {
            if self.rng.random::<f32>() < keep { scale } else { 0.0 }
        });

        let y = &x * &mask;
        self.mask = Some(mask);
        Ok(y)
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let Some(mask) = &self.mask else {
            return Ok(d);
        };

        if d.shape() != mask.shape() {
            return Err(MlErr::SizeMismatch {
                what: "dropout deltas",
                got: d.len(),
                expected: mask.len(),
            });
        }

        Ok(d * mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_is_the_identity() {
        let mut dropout = Dropout::new(0.5).unwrap();
        let x = Array2::<f32>::ones((4, 8)).into_dyn();

        let y = dropout.forward(x.clone(), Mode::Infer).unwrap();
        assert_eq!(y, x);
    }

    #[test]
    fn training_drops_and_rescales() {
        let mut dropout = Dropout::new(0.5).unwrap();
        let x = Array2::<f32>::ones((64, 128)).into_dyn();

        let y = dropout.forward(x, Mode::Train).unwrap();
        assert!(y.iter().all(|&v| v == 0.0 || v == 2.0));

        let kept = y.iter().filter(|&&v| v > 0.0).count() as f32 / y.len() as f32;
        assert!((kept - 0.5).abs() < 0.05);

        // The gradient flows only through the kept units, with the same scale.
        let dx = dropout.backward(Array2::ones((64, 128)).into_dyn()).unwrap();
        assert_eq!(dx, y);
    }

    #[test]
    fn same_seed_same_mask() {
        let x = Array2::<f32>::ones((4, 16)).into_dyn();
        let mut a = Dropout::new(0.5).unwrap();
        let mut b = Dropout::new(0.5).unwrap();
        a.reseed(7);
        b.reseed(7);

        assert_eq!(
            a.forward(x.clone(), Mode::Train).unwrap(),
            b.forward(x, Mode::Train).unwrap()
        );
    }

    #[test]
    fn out_of_range_rates_are_rejected() {
        assert!(Dropout::new(1.0).is_err());
        assert!(Dropout::new(-0.1).is_err());
    }
}
