use ndarray::ArrayD;

use super::{
    Model,
    layers::{Layer, Mode},
};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// A `Sequential` only describes the network, its parameters live in a separate flat buffer
/// which gets split in layer order, `size()` values in total.
#[derive(Clone, Debug)]
pub struct Sequential {
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `input_shape` - The shape of a single input sample.
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance or an error if a layer can't take the output of the previous one.
    pub fn new<I>(input_shape: &[usize], layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        let mut shape = input_shape.to_vec();

        for layer in &layers {
            shape = layer
                .output_shape(&shape)
                .ok_or_else(|| MlErr::InvalidInputShape {
                    shape: shape.clone(),
                    reason: "a layer can't take the output of the previous one",
                })?;
        }

        Ok(Self {
            input_shape: input_shape.to_vec(),
            output_shape: shape,
            layers,
        })
    }

    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    pub fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn check_size(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();

        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn forward(&mut self, params: &[f32], mut x: ArrayD<f32>, mode: Mode) -> Result<ArrayD<f32>> {
        self.check_size("parameters", params.len())?;

        if x.shape().get(1..) != Some(&self.input_shape[..]) {
            return Err(MlErr::InvalidInputShape {
                shape: x.shape().to_vec(),
                reason: "the batch doesn't match the model's input shape",
            });
        }

        let mut rest = params;
        for layer in self.layers.iter_mut() {
            let (layer_params, tail) = rest.split_at(layer.size());
            x = layer.forward(layer_params, x, mode)?;
            rest = tail;
        }

        Ok(x)
    }

    fn backward(&mut self, params: &[f32], grad: &mut [f32], mut d: ArrayD<f32>) -> Result<()> {
        self.check_size("parameters", params.len())?;
        self.check_size("gradient", grad.len())?;

        let mut rest = params;
        let mut grad_rest = grad;

        for layer in self.layers.iter_mut().rev() {
            let at = rest.len() - layer.size();
            let (head, layer_params) = rest.split_at(at);
            let (grad_head, layer_grad) = std::mem::take(&mut grad_rest).split_at_mut(at);

            d = layer.backward(layer_params, layer_grad, d)?;
            rest = head;
            grad_rest = grad_head;
        }

        Ok(())
    }

    fn reseed(&mut self, seed: u64) {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.reseed(seed.wrapping_add(i as u64));
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::prelude::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::arch::{
        activations::ActFn,
        loss::{LossFn, SparseCategoricalCrossentropy},
    };

    fn tiny_net() -> Sequential {
        let layers = [
            Layer::conv2d(1, 2, (2, 2), None),
            Layer::flatten(),
            Layer::dense((18, 3), None),
            Layer::softmax(),
        ];

        Sequential::new(&[4, 4, 1], layers).unwrap()
    }

    fn loss_at(model: &mut Sequential, params: &[f32], x: &ArrayD<f32>, y: &Array1<usize>) -> f32 {
        let y_pred = model.forward(params, x.clone(), Mode::Infer).unwrap();
        let y_pred = y_pred.into_dimensionality::<Ix2>().unwrap();

        SparseCategoricalCrossentropy::new()
            .loss(y_pred.view(), y.view())
            .unwrap()
    }

    #[test]
    fn shapes_are_checked_on_construction() {
        let model = tiny_net();
        assert_eq!(model.output_shape(), &[3]);
        assert_eq!(model.size(), (4 + 1) * 2 + (18 + 1) * 3);

        let broken = Sequential::new(&[4, 4, 1], [Layer::dense((16, 3), None)]);
        assert!(matches!(broken, Err(MlErr::InvalidInputShape { .. })));
    }

    #[test]
    fn wrong_parameter_or_input_sizes_are_rejected() {
        let mut model = tiny_net();
        let x = Array4::<f32>::zeros((1, 4, 4, 1)).into_dyn();

        let short = vec![0.; model.size() - 1];
        assert!(model.forward(&short, x, Mode::Infer).is_err());

        let params = vec![0.; model.size()];
        let x = Array4::<f32>::zeros((1, 5, 4, 1)).into_dyn();
        assert!(matches!(
            model.forward(&params, x, Mode::Infer),
            Err(MlErr::InvalidInputShape { .. })
        ));
    }

    #[test]
    fn backprop_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut model = tiny_net();

        let params: Vec<f32> = (0..model.size())
            .map(|_| rng.random_range(-0.5..0.5))
            .collect();
        let x = Array::from_shape_simple_fn((2, 4, 4, 1), || rng.random_range(0.0..1.0)).into_dyn();
        let y = array![0, 2];

        let mut grad = vec![0.; model.size()];
        model
            .backprop(&params, &mut grad, &SparseCategoricalCrossentropy::new(), x.clone(), y.view())
            .unwrap();

        let eps = 1e-2;
        for i in 0..params.len() {
            let mut plus = params.clone();
            let mut minus = params.clone();
            plus[i] += eps;
            minus[i] -= eps;

            let numeric = (loss_at(&mut model, &plus, &x, &y) - loss_at(&mut model, &minus, &x, &y))
                / (2. * eps);

            assert!(
                (numeric - grad[i]).abs() < 1e-2 + 5e-2 * grad[i].abs(),
                "param {i}: numeric {numeric}, analytic {}",
                grad[i]
            );
        }
    }

    #[test]
    fn relu_layers_train_towards_the_labels() {
        let mut rng = StdRng::seed_from_u64(3);
        let layers = [
            Layer::dense((2, 8), Some(ActFn::relu())),
            Layer::dense((8, 2), None),
            Layer::softmax(),
        ];
        let mut model = Sequential::new(&[2], layers).unwrap();
        let loss_fn = SparseCategoricalCrossentropy::new();

        let mut params: Vec<f32> = (0..model.size())
            .map(|_| rng.random_range(-0.5..0.5))
            .collect();
        let x = array![[1., 0.], [0., 1.], [0.9, 0.1], [0.1, 0.9]].into_dyn();
        let y = array![0, 1, 0, 1];

        let mut grad = vec![0.; model.size()];
        let first = model
            .backprop(&params, &mut grad, &loss_fn, x.clone(), y.view())
            .unwrap();

        for _ in 0..200 {
            model
                .backprop(&params, &mut grad, &loss_fn, x.clone(), y.view())
                .unwrap();
            params.iter_mut().zip(&grad).for_each(|(p, g)| *p -= 0.5 * g);
        }

        let last = model.evaluate(&params, &loss_fn, x, y.view()).unwrap();
        assert!(last.mean_loss() < first.mean_loss());
        assert_eq!(last.accuracy(), 1.);
    }
}
