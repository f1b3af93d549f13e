use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicU64, Ordering},
};

use log::{debug, info};
use machine_learning::dataset::{Batch, BatchSource};
use ndarray::Array4;

use crate::{
    DataErr, Result,
    pipeline::{self, DropRemainder, SHUFFLE_WINDOW, ShuffleWindow},
    prefetch::{PREFETCH_DEPTH, Prefetch},
    provider::{DatasetInfo, DatasetProvider, RawSplit, Split},
};

/// A split after rescaling, decoded once and shared by every epoch.
#[derive(Debug)]
struct Cached {
    pixels: Vec<f32>,
    labels: Vec<usize>,
}

/// A restartable sequence of shuffled, fixed-size batches over one split of a dataset.
///
/// The split is rescaled into `[0, 1]` the first time it's traversed and cached for later epochs.
/// Every epoch reshuffles with its own seed and prepares batches on a background thread.
#[derive(Debug)]
pub struct BatchedDataset {
    raw: RawSplit,
    cache: OnceLock<Arc<Cached>>,
    batch_size: usize,
    seed: u64,
    epoch: AtomicU64,
}

impl BatchedDataset {
    /// Creates a new `BatchedDataset`.
    ///
    /// # Arguments
    /// * `raw` - The decoded split.
    /// * `batch_size` - The exact size of every batch.
    /// * `seed` - The base seed of the per-epoch shuffles.
    ///
    /// # Returns
    /// The dataset or an error if `batch_size` is zero.
    pub fn new(raw: RawSplit, batch_size: usize, seed: u64) -> Result<Self> {
        if batch_size == 0 {
            return Err(DataErr::InvalidBatchSize);
        }

        Ok(Self {
            raw,
            cache: OnceLock::new(),
            batch_size,
            seed,
            epoch: AtomicU64::new(0),
        })
    }

    fn cached(&self) -> Arc<Cached> {
        let cached = self.cache.get_or_init(|| {
            debug!("caching {} rescaled examples", self.raw.len());

            Arc::new(Cached {
                pixels: pipeline::rescale(&self.raw.pixels),
                labels: self.raw.labels.iter().map(|&l| l as usize).collect(),
            })
        });

        Arc::clone(cached)
    }
}

impl BatchSource for BatchedDataset {
    fn epoch(&self) -> Box<dyn Iterator<Item = Batch> + '_> {
        let cached = self.cached();
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
        let seed = self.seed.wrapping_add(epoch);

        let (h, w, c) = self.raw.image_shape;
        let image_len = h * w * c;
        let batch_size = self.batch_size;

        let order = ShuffleWindow::new(0..cached.labels.len(), SHUFFLE_WINDOW, seed);
        let batches = DropRemainder::new(order, batch_size).map(move |indices| {
            let images = Array4::from_shape_fn((batch_size, h, w, c), |(b, i, j, k)| {
                cached.pixels[indices[b] * image_len + (i * w + j) * c + k]
            });
            let labels = indices.iter().map(|&i| cached.labels[i]).collect();

            Batch { images, labels }
        });

        Box::new(Prefetch::spawn(batches, PREFETCH_DEPTH))
    }

    fn num_batches(&self) -> usize {
        self.raw.len() / self.batch_size
    }
}

/// Both preprocessed partitions of a dataset and its metadata.
#[derive(Debug)]
pub struct Loaded {
    pub train: BatchedDataset,
    pub test: BatchedDataset,
    pub info: DatasetInfo,
}

/// Fetches the `train` and `test` splits of `name` and turns each into batches of exactly
/// `batch_size` examples: rescale, cache, shuffle, batch and prefetch.
///
/// # Arguments
/// * `provider` - Where to fetch the dataset from.
/// * `name` - The dataset's name.
/// * `batch_size` - The size of every batch.
/// * `seed` - The base shuffle seed of both splits.
///
/// # Returns
/// The preprocessed dataset or an error if it couldn't be fetched or decoded.
pub fn load_and_preprocess<P>(
    provider: &P,
    name: &str,
    batch_size: usize,
    seed: u64,
) -> Result<Loaded>
where
    P: DatasetProvider + ?Sized,
{
    if batch_size == 0 {
        return Err(DataErr::InvalidBatchSize);
    }

    let mut info = provider.info(name)?;
    let train = provider.load(name, Split::Train)?;
    let test = provider.load(name, Split::Test)?;

    for (split, raw) in [("train", &train), ("test", &test)] {
        if raw.image_shape != info.image_shape {
            return Err(DataErr::ShapeMismatch {
                split,
                expected: info.image_shape,
                got: raw.image_shape,
            });
        }

        raw.check_labels(info.num_classes)?;
    }

    info.train_examples = train.len();
    info.test_examples = test.len();

    info!(
        "loaded {}: {} train and {} test examples of shape {:?}",
        info.name, info.train_examples, info.test_examples, info.image_shape
    );

    Ok(Loaded {
        train: BatchedDataset::new(train, batch_size, seed)?,
        test: BatchedDataset::new(test, batch_size, seed.wrapping_add(1 << 32))?,
        info,
    })
}
