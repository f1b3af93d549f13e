use crate::{DataErr, Result};

/// The partitions of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

/// What is known about a dataset before loading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub name: String,
    pub num_classes: usize,
    /// `(height, width, channels)` of every image.
    pub image_shape: (usize, usize, usize),
    pub train_examples: usize,
    pub test_examples: usize,
}

impl DatasetInfo {
    pub fn examples(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train_examples,
            Split::Test => self.test_examples,
        }
    }
}

/// A decoded split: every image's raw `u8` pixels, channels-last and back to back, and its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSplit {
    pub image_shape: (usize, usize, usize),
    pub pixels: Vec<u8>,
    pub labels: Vec<u8>,
}

impl RawSplit {
    /// Creates a new `RawSplit`, checking that there's exactly one label per image.
    pub fn new(image_shape: (usize, usize, usize), pixels: Vec<u8>, labels: Vec<u8>) -> Result<Self> {
        let (h, w, c) = image_shape;
        let image_len = h
            .checked_mul(w)
            .and_then(|n| n.checked_mul(c))
            .filter(|&n| n > 0)
            .ok_or_else(|| DataErr::InvalidHeader {
                what: "image shape",
                dims: vec![h, w, c],
            })?;

        let images = pixels.len() / image_len;
        if pixels.len() % image_len != 0 || images != labels.len() {
            return Err(DataErr::CountMismatch {
                images,
                labels: labels.len(),
            });
        }

        Ok(Self {
            image_shape,
            pixels,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Checks every label against the amount of classes.
    pub fn check_labels(&self, num_classes: usize) -> Result<()> {
        match self.labels.iter().find(|&&label| label as usize >= num_classes) {
            Some(&label) => Err(DataErr::LabelOutOfRange {
                label: label as usize,
                num_classes,
            }),
            None => Ok(()),
        }
    }
}

/// A source of named, labeled image datasets.
pub trait DatasetProvider {
    /// Describes the dataset called `name`.
    fn info(&self, name: &str) -> Result<DatasetInfo>;

    /// Fetches and decodes one split of the dataset called `name`.
    fn load(&self, name: &str, split: Split) -> Result<RawSplit>;
}
