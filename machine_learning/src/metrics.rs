use std::ops::AddAssign;

use ndarray::{ArrayView1, ArrayView2, Axis};

/// The amount of rows whose highest probability sits at the labeled class.
///
/// Ties resolve to the lowest class index.
pub fn correct_predictions(y_pred: ArrayView2<f32>, y: ArrayView1<usize>) -> usize {
    y_pred
        .axis_iter(Axis(0))
        .zip(y.iter())
        .filter(|(row, label)| argmax(row.iter().copied()) == Some(**label))
        .count()
}

fn argmax<I>(values: I) -> Option<usize>
where
    I: Iterator<Item = f32>,
{
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Loss and accuracy bookkeeping for one or more batches.
///
/// `loss` is the sum of the per-sample losses, so that batches of different sizes weigh in
/// proportion to their samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatchMetrics {
    pub loss: f32,
    pub correct: usize,
    pub seen: usize,
}

impl BatchMetrics {
    /// Creates the metrics of a single batch out of its mean loss.
    pub fn new(mean_loss: f32, correct: usize, seen: usize) -> Self {
        Self {
            loss: mean_loss * seen as f32,
            correct,
            seen,
        }
    }

    pub fn mean_loss(&self) -> f32 {
        if self.seen == 0 {
            return 0.;
        }

        self.loss / self.seen as f32
    }

    pub fn accuracy(&self) -> f32 {
        if self.seen == 0 {
            return 0.;
        }

        self.correct as f32 / self.seen as f32
    }
}

impl AddAssign for BatchMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.loss += rhs.loss;
        self.correct += rhs.correct;
        self.seen += rhs.seen;
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn counts_rows_predicting_their_label() {
        let y_pred = array![[0.1, 0.9], [0.7, 0.3], [0.5, 0.5]];
        let y = array![1, 1, 0];

        assert_eq!(correct_predictions(y_pred.view(), y.view()), 2);
    }

    #[test]
    fn metrics_are_sample_weighted() {
        let mut total = BatchMetrics::new(1.0, 4, 4);
        total += BatchMetrics::new(4.0, 0, 1);

        assert_eq!(total.seen, 5);
        assert!((total.mean_loss() - 8.0 / 5.0).abs() < 1e-6);
        assert!((total.accuracy() - 0.8).abs() < 1e-6);
        assert_eq!(BatchMetrics::default().accuracy(), 0.);
    }
}
