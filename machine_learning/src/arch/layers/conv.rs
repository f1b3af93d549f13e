use ndarray::{linalg, prelude::*};

use super::{Fans, standard};
use crate::{MlErr, Result, arch::activations::ActFn};

/// A 2D convolution over channels-last inputs `(n, h, w, c)` with stride 1 and no padding.
///
/// The kernel is stored as `(kh, kw, c_in, filters)` row-major followed by `filters` biases,
/// so that an im2col patch row multiplies the kernel viewed as `(kh * kw * c_in, filters)`.
#[derive(Clone, Debug)]
pub struct Conv2d {
    in_channels: usize,
    filters: usize,
    kernel: (usize, usize),
    act_fn: Option<ActFn>,

    // Forward metadata
    x_dim: (usize, usize, usize, usize),
    cols: Array2<f32>,
    z: Array2<f32>,
}

impl Conv2d {
    /// Creates a new `Conv2d`.
    ///
    /// # Arguments
    /// * `in_channels` - The amount of channels of the input.
    /// * `filters` - The amount of filters, that is, channels of the output.
    /// * `kernel` - The spatial size of each filter.
    /// * `act_fn` - An optional activation applied to the convolution output.
    pub fn new(
        in_channels: usize,
        filters: usize,
        kernel: (usize, usize),
        act_fn: Option<ActFn>,
    ) -> Self {
        Self {
            in_channels,
            filters,
            kernel,
            act_fn,
            x_dim: (0, 0, 0, 0),
            cols: Array2::zeros((0, 0)),
            z: Array2::zeros((0, 0)),
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.patch_len() * self.filters + self.filters
    }

    pub fn fans(&self) -> Fans {
        let area = self.kernel.0 * self.kernel.1;

        Fans {
            fan_in: area * self.in_channels,
            fan_out: area * self.filters,
            weights: self.patch_len() * self.filters,
            biases: self.filters,
        }
    }

    pub fn output_shape(&self, input: &[usize]) -> Option<Vec<usize>> {
        let &[h, w, c] = input else {
            return None;
        };

        let (kh, kw) = self.kernel;
        if c != self.in_channels || h < kh || w < kw {
            return None;
        }

        Some(vec![h - kh + 1, w - kw + 1, self.filters])
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, h, w, c) = x.dim();
        let (kh, kw) = self.kernel;

        if c != self.in_channels || h < kh || w < kw {
            return Err(MlErr::InvalidInputShape {
                shape: x.shape().to_vec(),
                reason: "the input does not fit the convolution kernel",
            });
        }

        let (ho, wo) = (h - kh + 1, w - kw + 1);
        let cols = self.im2col(&x, ho, wo);
        let (kernel, biases) = self.view_params(params)?;

        let mut z = cols.dot(&kernel);
        z += &biases;

        let a = match self.act_fn {
            Some(act_fn) => z.mapv(|z| act_fn.f(z)),
            None => z.clone(),
        };

        self.x_dim = (n, h, w, c);
        self.cols = cols;
        self.z = z;

        let a = a.into_shape_with_order((n, ho, wo, self.filters))?;
        Ok(a.into_dyn())
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let rows = self.z.nrows();
        let mut d = standard(d).into_shape_with_order((rows, self.filters))?;

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dk, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &self.cols.t(), &d, 0.0, &mut dk);
        db.assign(&d.sum_axis(Axis(0)));

        let (kernel, _) = self.view_params(params)?;
        let dcols = d.dot(&kernel.t());
        Ok(self.col2im(&dcols).into_dyn())
    }

    fn patch_len(&self) -> usize {
        self.kernel.0 * self.kernel.1 * self.in_channels
    }

    /// Unfolds every receptive field of `x` into a row, producing a `(n * ho * wo, kh * kw * c)`
    /// matrix.
    fn im2col(&self, x: &Array4<f32>, ho: usize, wo: usize) -> Array2<f32> {
        let n = x.dim().0;
        let (kh, kw) = self.kernel;
        let mut cols = Array2::zeros((n * ho * wo, self.patch_len()));

        for (r, mut row) in cols.outer_iter_mut().enumerate() {
            let (b, i, j) = (r / (ho * wo), (r / wo) % ho, r % wo);
            let patch = x.slice(s![b, i..i + kh, j..j + kw, ..]);
            row.iter_mut().zip(patch.iter()).for_each(|(dst, &src)| *dst = src);
        }

        cols
    }

    /// Folds the patch gradients back onto the input positions they were read from.
    fn col2im(&self, dcols: &Array2<f32>) -> Array4<f32> {
        let (n, h, w, c) = self.x_dim;
        let (kh, kw) = self.kernel;
        let (ho, wo) = (h - kh + 1, w - kw + 1);
        let mut dx = Array4::zeros((n, h, w, c));

        for (r, row) in dcols.outer_iter().enumerate() {
            let (b, i, j) = (r / (ho * wo), (r / wo) % ho, r % wo);
            let mut patch = dx.slice_mut(s![b, i..i + kh, j..j + kw, ..]);
            patch.iter_mut().zip(row.iter()).for_each(|(dst, &src)| *dst += src);
        }

        dx
    }

    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let (dk_raw, db_raw) = grad.split_at_mut(self.patch_len() * self.filters);
        let dk = ArrayViewMut2::from_shape((self.patch_len(), self.filters), dk_raw)?;
        let db = ArrayViewMut1::from_shape(self.filters, db_raw)?;
        Ok((dk, db))
    }

    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let (k_raw, b_raw) = params.split_at(self.patch_len() * self.filters);
        let kernel = ArrayView2::from_shape((self.patch_len(), self.filters), k_raw)?;
        let biases = ArrayView1::from_shape(self.filters, b_raw)?;
        Ok((kernel, biases))
    }
}
