use super::{Sequential, activations::ActFn, layers::Layer};
use crate::{MlErr, Result};

/// The probability of dropping a hidden unit of the classifier head while training.
pub const DROPOUT_RATE: f32 = 0.5;

/// The smallest height or width that survives both convolution and pooling stages.
pub const MIN_SPATIAL_SIZE: usize = 10;

/// Declares the image classification network:
///
/// `conv(32, 3x3, relu) → max pool(2x2) → conv(64, 3x3, relu) → max pool(2x2) → flatten →
/// dense(128, relu) → dropout(0.5) → dense(num_classes) → softmax`
///
/// Every call returns a fresh, untrained model. No parameters are created here.
///
/// # Arguments
/// * `input_shape` - The `(height, width, channels)` of a single image.
/// * `num_classes` - The amount of classes to predict.
///
/// # Returns
/// The network, or an error if the images are too small for it or `num_classes` is zero.
pub fn conv_net(input_shape: (usize, usize, usize), num_classes: usize) -> Result<Sequential> {
    let (h, w, c) = input_shape;
    let shape = vec![h, w, c];

    if h < MIN_SPATIAL_SIZE || w < MIN_SPATIAL_SIZE {
        return Err(MlErr::InvalidInputShape {
            shape,
            reason: "the images are too small for two convolution and pooling stages",
        });
    }

    if c == 0 {
        return Err(MlErr::InvalidInputShape {
            shape,
            reason: "the images need at least one channel",
        });
    }

    if num_classes == 0 {
        return Err(MlErr::InvalidInputShape {
            shape,
            reason: "the model needs at least one class",
        });
    }

    let stage = |x: usize| (x - 2) / 2;
    let (fh, fw) = (stage(stage(h)), stage(stage(w)));
    let flat = fh * fw * 64;

    let layers = [
        Layer::conv2d(c, 32, (3, 3), Some(ActFn::relu())),
        Layer::max_pool2d((2, 2)),
        Layer::conv2d(32, 64, (3, 3), Some(ActFn::relu())),
        Layer::max_pool2d((2, 2)),
        Layer::flatten(),
        Layer::dense((flat, 128), Some(ActFn::relu())),
        Layer::dropout(DROPOUT_RATE)?,
        Layer::dense((128, num_classes), None),
        Layer::softmax(),
    ];

    Sequential::new(&shape, layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Model, layers::Fans};

    #[test]
    fn mnist_topology() {
        let model = conv_net((28, 28, 1), 10).unwrap();

        assert_eq!(model.layers().len(), 9);
        assert_eq!(model.output_shape(), &[10]);

        let dense = model.layers()[5].fans().unwrap();
        assert_eq!(dense.fan_in, 1600);

        let expected = (9 + 1) * 32 + (288 + 1) * 64 + (1600 + 1) * 128 + (128 + 1) * 10;
        assert_eq!(model.size(), expected);
    }

    #[test]
    fn calls_are_structurally_identical() {
        let a = conv_net((28, 28, 1), 10).unwrap();
        let b = conv_net((28, 28, 1), 10).unwrap();

        let fans = |m: &Sequential| m.layers().iter().map(|l| l.fans()).collect::<Vec<Option<Fans>>>();
        assert_eq!(a.size(), b.size());
        assert_eq!(fans(&a), fans(&b));
    }

    #[test]
    fn smallest_images_still_fit() {
        let model = conv_net((10, 12, 3), 2).unwrap();
        assert_eq!(model.layers()[5].fans().unwrap().fan_in, 64);
    }

    #[test]
    fn invalid_shapes_are_rejected() {
        for (shape, classes) in [((9, 28, 1), 10), ((28, 9, 1), 10), ((28, 28, 0), 10), ((28, 28, 1), 0)] {
            assert!(matches!(
                conv_net(shape, classes),
                Err(MlErr::InvalidInputShape { .. })
            ));
        }
    }
}
