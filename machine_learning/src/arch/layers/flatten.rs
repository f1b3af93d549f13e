use ndarray::prelude::*;

use super::standard;
use crate::Result;

/// Collapses every dimension but the batch one.
#[derive(Clone, Debug, Default)]
pub struct Flatten {
    x_shape: Vec<usize>,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_shape(&self, input: &[usize]) -> Option<Vec<usize>> {
        Some(vec![input.iter().product()])
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let n = x.shape().first().copied().unwrap_or_default();
        let features = x.shape().iter().skip(1).product();

        self.x_shape = x.shape().to_vec();
        let y = standard(x).into_shape_with_order(IxDyn(&[n, features]))?;
        Ok(y)
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let dx = standard(d).into_shape_with_order(IxDyn(&self.x_shape))?;
        Ok(dx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_round_trips_the_shape() {
        let mut flatten = Flatten::new();
        let x = Array4::<f32>::zeros((3, 5, 5, 64)).into_dyn();

        let y = flatten.forward(x).unwrap();
        assert_eq!(y.shape(), &[3, 1600]);

        let dx = flatten.backward(y).unwrap();
        assert_eq!(dx.shape(), &[3, 5, 5, 64]);
    }
}
