use ndarray::{Array1, Array4, Axis};

use crate::{MlErr, Result};

/// A batch of channels-last images `(n, h, w, c)` with their class labels `(n,)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub images: Array4<f32>,
    pub labels: Array1<usize>,
}

impl Batch {
    /// Creates a new `Batch`, checking that there's one label per image.
    pub fn new(images: Array4<f32>, labels: Array1<usize>) -> Result<Self> {
        if images.len_of(Axis(0)) != labels.len() {
            return Err(MlErr::SizeMismatch {
                what: "batch labels",
                got: labels.len(),
                expected: images.len_of(Axis(0)),
            });
        }

        Ok(Self { images, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A finite, restartable source of batches.
pub trait BatchSource {
    /// Starts a new pass over the data.
    fn epoch(&self) -> Box<dyn Iterator<Item = Batch> + '_>;

    /// The amount of batches every pass yields.
    fn num_batches(&self) -> usize;
}
