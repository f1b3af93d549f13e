mod chained;
mod constant;
mod error;
mod param_gen;
mod random;

use std::{cell::RefCell, rc::Rc};

use rand::Rng;

pub use chained::ChainedParamGen;
pub use constant::ConstParamGen;
pub use param_gen::ParamGen;
pub use random::RandParamGen;

use crate::{MlErr, Result, arch::Sequential};

/// Creates the parameters of `model`: Glorot uniform kernels and zeroed biases for every layer
/// that has parameters, in the order the model reads them.
///
/// # Arguments
/// * `model` - The model to create parameters for.
/// * `rng` - The source of randomness for the kernels.
///
/// # Returns
/// The flat parameter buffer, or an error if a layer's fans are invalid.
pub fn glorot_uniform<R: Rng + 'static>(model: &Sequential, rng: R) -> Result<Vec<f32>> {
    let rng = Rc::new(RefCell::new(rng));
    let mut param_gens: Vec<Box<dyn ParamGen>> = Vec::new();

    for fans in model.layers().iter().filter_map(|layer| layer.fans()) {
        let kernel =
            RandParamGen::glorot_uniform(rng.clone(), fans.weights, fans.fan_in, fans.fan_out)?;
        param_gens.push(Box::new(kernel));
        param_gens.push(Box::new(ConstParamGen::new(0., fans.biases)));
    }

    let size = model.layers().iter().map(|layer| layer.size()).sum();
    let params = ChainedParamGen::new(param_gens).sample(size).unwrap_or_default();

    if params.len() != size {
        return Err(MlErr::SizeMismatch {
            what: "initial parameters",
            got: params.len(),
            expected: size,
        });
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::arch::{Model, builder::conv_net};

    #[test]
    fn kernels_are_random_and_biases_zero() {
        let model = conv_net((12, 12, 1), 3).unwrap();
        let params = glorot_uniform(&model, StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(params.len(), model.size());

        // The first conv has 9 * 32 kernel weights followed by 32 biases.
        let limit = (6. / (9. + 288.) as f32).sqrt();
        assert!(params[..288].iter().all(|w| w.abs() <= limit));
        assert!(params[..288].iter().any(|&w| w != 0.));
        assert!(params[288..320].iter().all(|&b| b == 0.));
    }

    #[test]
    fn seeds_decide_the_parameters() {
        let model = conv_net((12, 12, 1), 3).unwrap();

        let a = glorot_uniform(&model, StdRng::seed_from_u64(1)).unwrap();
        let b = glorot_uniform(&model, StdRng::seed_from_u64(1)).unwrap();
        let c = glorot_uniform(&model, StdRng::seed_from_u64(2)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
