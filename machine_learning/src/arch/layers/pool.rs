use ndarray::prelude::*;

use crate::{MlErr, Result};

/// Max pooling over non-overlapping windows of a channels-last input, dropping any trailing
/// rows or columns that do not fill a whole window.
#[derive(Clone, Debug)]
pub struct MaxPool2d {
    pool: (usize, usize),

    // Forward metadata
    x_dim: (usize, usize, usize, usize),
    argmax: Vec<usize>,
}

impl MaxPool2d {
    pub fn new(pool: (usize, usize)) -> Self {
        Self {
            pool,
            x_dim: (0, 0, 0, 0),
            argmax: Vec::new(),
        }
    }

    pub fn output_shape(&self, input: &[usize]) -> Option<Vec<usize>> {
        let &[h, w, c] = input else {
            return None;
        };

        let (ho, wo) = (h / self.pool.0, w / self.pool.1);
        (ho > 0 && wo > 0).then(|| vec![ho, wo, c])
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, h, w, c) = x.dim();
        let (ph, pw) = self.pool;
        let (ho, wo) = (h / ph, w / pw);

        if ho == 0 || wo == 0 {
            return Err(MlErr::InvalidInputShape {
                shape: x.shape().to_vec(),
                reason: "the input is smaller than the pooling window",
            });
        }

        let mut y = Array4::zeros((n, ho, wo, c));
        self.argmax.clear();
        self.argmax.reserve(n * ho * wo * c);

        for ((b, i, j, ch), out) in y.indexed_iter_mut() {
            let mut best = f32::NEG_INFINITY;
            let mut best_at = 0;

            for r in i * ph..(i + 1) * ph {
                for col in j * pw..(j + 1) * pw {
                    let v = x[[b, r, col, ch]];
                    if v > best {
                        best = v;
                        best_at = ((b * h + r) * w + col) * c + ch;
                    }
                }
            }

            *out = best;
            self.argmax.push(best_at);
        }

        self.x_dim = (n, h, w, c);
        Ok(y.into_dyn())
    }

    /// Routes each incoming delta to the input position that won its window.
    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        if d.len() != self.argmax.len() {
            return Err(MlErr::SizeMismatch {
                what: "max pooling deltas",
                got: d.len(),
                expected: self.argmax.len(),
            });
        }

        let mut dx = vec![0.; self.x_dim.0 * self.x_dim.1 * self.x_dim.2 * self.x_dim.3];

        // `indexed_iter_mut` above walks the output in logical order, and so does `iter`.
        for (&at, &delta) in self.argmax.iter().zip(d.iter()) {
            dx[at] += delta;
        }

        let dx = Array4::from_shape_vec(self.x_dim, dx)?;
        Ok(dx.into_dyn())
    }
}
