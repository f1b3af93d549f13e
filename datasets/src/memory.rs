use std::collections::HashMap;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    DataErr, Result,
    provider::{DatasetInfo, DatasetProvider, RawSplit, Split},
};

#[derive(Debug, Clone)]
struct Entry {
    num_classes: usize,
    train: RawSplit,
    test: RawSplit,
}

/// Serves datasets already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    datasets: HashMap<String, Entry>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a dataset under `name`, replacing any previous one.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        num_classes: usize,
        train: RawSplit,
        test: RawSplit,
    ) {
        let entry = Entry {
            num_classes,
            train,
            test,
        };

        self.datasets.insert(name.into(), entry);
    }

    /// Registers a dataset of random images whose labels are spread evenly over the classes.
    ///
    /// # Arguments
    /// * `name` - The name to register the dataset under.
    /// * `image_shape` - The `(height, width, channels)` of every image.
    /// * `num_classes` - The amount of classes.
    /// * `examples` - The amount of `(train, test)` examples.
    /// * `seed` - The seed for the pixels.
    pub fn synthetic(
        mut self,
        name: impl Into<String>,
        image_shape: (usize, usize, usize),
        num_classes: usize,
        examples: (usize, usize),
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let (h, w, c) = image_shape;

        let mut split = |n: usize| {
            let pixels = (0..n * h * w * c).map(|_| rng.random()).collect();
            let labels = (0..n).map(|i| (i % num_classes.max(1)) as u8).collect();
            RawSplit::new(image_shape, pixels, labels)
        };

        let train = split(examples.0)?;
        let test = split(examples.1)?;

        self.insert(name, num_classes, train, test);
        Ok(self)
    }

    fn entry(&self, name: &str) -> Result<&Entry> {
        self.datasets
            .get(name)
            .ok_or_else(|| DataErr::UnknownDataset(name.to_string()))
    }
}

impl DatasetProvider for InMemoryProvider {
    fn info(&self, name: &str) -> Result<DatasetInfo> {
        let entry = self.entry(name)?;

        Ok(DatasetInfo {
            name: name.to_string(),
            num_classes: entry.num_classes,
            image_shape: entry.train.image_shape,
            train_examples: entry.train.len(),
            test_examples: entry.test.len(),
        })
    }

    fn load(&self, name: &str, split: Split) -> Result<RawSplit> {
        let entry = self.entry(name)?;

        let split = match split {
            Split::Train => &entry.train,
            Split::Test => &entry.test,
        };

        Ok(split.clone())
    }
}
