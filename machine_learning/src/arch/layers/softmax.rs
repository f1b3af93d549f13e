use ndarray::prelude::*;

use crate::{MlErr, Result};

/// Row-wise softmax, turning logits into a probability distribution over classes.
#[derive(Clone, Debug, Default)]
pub struct Softmax {
    s: Array2<f32>,
}

impl Softmax {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let mut s = x.into_dimensionality::<Ix2>()?;

        for mut row in s.rows_mut() {
            let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }

        self.s = s.clone();
        Ok(s.into_dyn())
    }

    /// Jacobian-vector product of the softmax, `dx = s * (d - <d, s>)` per row.
    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let mut d = d.into_dimensionality::<Ix2>()?;

        if d.dim() != self.s.dim() {
            return Err(MlErr::SizeMismatch {
                what: "softmax deltas",
                got: d.len(),
                expected: self.s.len(),
            });
        }

        for (mut d_row, s_row) in d.rows_mut().into_iter().zip(self.s.rows()) {
            let dot = d_row.dot(&s_row);
            d_row.zip_mut_with(&s_row, |d, &s| *d = s * (*d - dot));
        }

        Ok(d.into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_probability_distributions() {
        let mut softmax = Softmax::new();
        let x = array![[1f32, 2., 3.], [1000., 1000., 1000.]].into_dyn();

        let s = softmax.forward(x).unwrap();
        for row in s.rows() {
            assert!((row.sum() - 1.).abs() < 1e-6);
            assert!(row.iter().all(|p| (0. ..=1.).contains(p)));
        }
    }

    #[test]
    fn uniform_deltas_vanish() {
        let mut softmax = Softmax::new();
        softmax.forward(array![[0.3f32, -1., 2.]].into_dyn()).unwrap();

        let dx = softmax.backward(array![[1f32, 1., 1.]].into_dyn()).unwrap();
        assert!(dx.iter().all(|v| v.abs() < 1e-6));
    }
}
