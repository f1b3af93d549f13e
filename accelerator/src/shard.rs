use std::ops::Range;

use machine_learning::dataset::Batch;
use ndarray::{Array4, ArrayView1, s};

use crate::error::ReplicaErr;

/// Splits `total` samples among `num_replicas` and returns the shard for `replica`.
///
/// Ranges are contiguous, disjoint and cover `[0..total)`, their sizes differ by at most 1.
pub fn shard_range(total: usize, replica: usize, num_replicas: usize) -> Range<usize> {
    let base = total / num_replicas;
    let rem = total % num_replicas;

    let start = replica * base + replica.min(rem);
    let extra = usize::from(replica < rem);
    start..start + base + extra
}

/// The part of a global batch a single replica works on.
#[derive(Debug)]
pub struct Shard<'a> {
    pub images: Array4<f32>,
    pub labels: ArrayView1<'a, usize>,
}

/// Splits a global batch into one equally sized shard per replica.
///
/// # Returns
/// The shards in replica order, or an error if the batch isn't a multiple of `num_replicas`.
pub fn split(batch: &Batch, num_replicas: usize) -> Result<Vec<Shard<'_>>, ReplicaErr> {
    if num_replicas == 0 || batch.len() % num_replicas != 0 {
        return Err(ReplicaErr::UnevenShards {
            batch: batch.len(),
            replicas: num_replicas,
        });
    }

    let shards = (0..num_replicas)
        .map(|replica| {
            let range = shard_range(batch.len(), replica, num_replicas);

            Shard {
                images: batch.images.slice(s![range.clone(), .., .., ..]).to_owned(),
                labels: batch.labels.slice(s![range]),
            }
        })
        .collect();

    Ok(shards)
}

#[cfg(test)]
mod tests {
    use ndarray::Array1;

    use super::*;

    fn batch(n: usize) -> Batch {
        let images = Array4::from_shape_fn((n, 2, 2, 1), |(i, ..)| i as f32);
        Batch::new(images, Array1::from_iter(0..n)).unwrap()
    }

    #[test]
    fn shard_range_balanced() {
        // total 10, replicas 3 => sizes 4,3,3
        assert_eq!(shard_range(10, 0, 3), 0..4);
        assert_eq!(shard_range(10, 1, 3), 4..7);
        assert_eq!(shard_range(10, 2, 3), 7..10);
    }

    #[test]
    fn shards_are_consecutive_and_even() {
        let batch = batch(6);
        let shards = split(&batch, 3).unwrap();

        assert_eq!(shards.len(), 3);
        for (i, shard) in shards.iter().enumerate() {
            assert_eq!(shard.images.dim(), (2, 2, 2, 1));
            assert_eq!(shard.labels.to_vec(), vec![2 * i, 2 * i + 1]);
            assert_eq!(shard.images[[1, 0, 0, 0]], (2 * i + 1) as f32);
        }
    }

    #[test]
    fn uneven_batches_are_refused() {
        assert!(matches!(
            split(&batch(5), 2),
            Err(ReplicaErr::UnevenShards { batch: 5, replicas: 2 })
        ));
        assert!(split(&batch(4), 0).is_err());
    }
}
