use std::{num::NonZeroUsize, path::PathBuf};

use datasets::mnist::MNIST;

const DEFAULT_DATA_DIR: &str = "data/mnist";
const DEFAULT_BATCH_SIZE_PER_REPLICA: NonZeroUsize = NonZeroUsize::new(128).unwrap();
const DEFAULT_EPOCHS: NonZeroUsize = NonZeroUsize::new(5).unwrap();

/// Everything a training run needs to know up front.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dataset: String,
    pub data_dir: PathBuf,
    /// The amount of replicas, `None` for one per available core.
    pub replicas: Option<usize>,
    pub batch_size_per_replica: NonZeroUsize,
    pub epochs: NonZeroUsize,
    pub learning_rate: f32,
    /// Whether to evaluate on the test split once training is over.
    pub evaluate: bool,
    /// Seeds the parameters, dropout and shuffling, `None` for OS entropy.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dataset: MNIST.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            replicas: None,
            batch_size_per_replica: DEFAULT_BATCH_SIZE_PER_REPLICA,
            epochs: DEFAULT_EPOCHS,
            learning_rate: 1e-3,
            evaluate: true,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_run() {
        let config = RunConfig::default();

        assert_eq!(config.dataset, "mnist");
        assert_eq!(config.data_dir, PathBuf::from("data/mnist"));
        assert_eq!(config.replicas, None);
        assert_eq!(config.batch_size_per_replica.get(), 128);
        assert_eq!(config.epochs.get(), 5);
        assert_eq!(config.learning_rate, 1e-3);
        assert!(config.evaluate);
        assert_eq!(config.seed, None);
    }
}
