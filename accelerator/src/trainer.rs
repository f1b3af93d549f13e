use std::time::Instant;

use log::{debug, info};
use machine_learning::{
    arch::{Model, Sequential, loss::LossFn},
    dataset::{Batch, BatchSource},
    initialization,
    metrics::BatchMetrics,
    optimization::Optimizer,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use crate::{
    ensemble,
    error::ReplicaErr,
    history::{EpochStats, History},
    shard,
    strategy::StrategyScope,
};

type Result<T> = std::result::Result<T, ReplicaErr>;

/// A replica's own copy of the network (for its forward caches and dropout) and its gradient.
#[derive(Debug)]
struct Replica {
    model: Sequential,
    grad: Vec<f32>,
}

/// A model compiled within a strategy's scope.
///
/// It owns the mirrored parameters, which every replica reads during a step, and one optimizer
/// that applies the averaged gradient of each global batch.
#[derive(Debug)]
pub struct DistributedModel<L, O> {
    owner: u64,
    replicas: Vec<Replica>,
    params: Vec<f32>,
    grad: Vec<f32>,
    loss_fn: L,
    optimizer: O,
}

impl<L, O> DistributedModel<L, O>
where
    L: LossFn + Sync,
    O: Optimizer,
{
    pub(crate) fn new<F>(
        scope: &StrategyScope<'_>,
        model: Sequential,
        loss_fn: L,
        optimizer_factory: F,
        seed: Option<u64>,
    ) -> Result<Self>
    where
        F: FnOnce(usize) -> machine_learning::Result<O>,
    {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let dropout_seed: u64 = rng.random();
        let params = initialization::glorot_uniform(&model, rng)?;
        let size = params.len();
        let optimizer = optimizer_factory(size)?;

        let replicas = (0..scope.num_replicas())
            .map(|i| {
                let mut model = model.clone();
                model.reseed(dropout_seed.wrapping_add((i as u64) << 32));

                Replica {
                    model,
                    grad: vec![0.; size],
                }
            })
            .collect();

        debug!(
            "compiled a model with {size} parameters on {} replicas",
            scope.num_replicas()
        );

        Ok(Self {
            owner: scope.strategy_id(),
            replicas,
            params,
            grad: vec![0.; size],
            loss_fn,
            optimizer,
        })
    }

    /// Returns the amount of trainable parameters.
    pub fn size(&self) -> usize {
        self.params.len()
    }

    /// Returns the current mirrored parameters.
    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn num_replicas(&self) -> usize {
        self.replicas.len()
    }

    /// Trains the model, one synchronous data-parallel step per batch.
    ///
    /// # Arguments
    /// * `scope` - The scope of the strategy the model was compiled in.
    /// * `train` - The training batches, traversed once per epoch.
    /// * `epochs` - The amount of passes over `train`.
    /// * `validation` - Batches to evaluate on after every epoch.
    /// * `on_epoch` - Called with the metrics of every finished epoch.
    ///
    /// # Returns
    /// The history of the run or the first error found.
    pub fn fit<F>(
        &mut self,
        scope: &StrategyScope<'_>,
        train: &dyn BatchSource,
        epochs: usize,
        validation: Option<&dyn BatchSource>,
        mut on_epoch: F,
    ) -> Result<History>
    where
        F: FnMut(&EpochStats),
    {
        scope.check(self.owner)?;
        let mut history = History::new();

        for epoch in 1..=epochs {
            let start = Instant::now();
            let mut metrics = BatchMetrics::default();

            for (step, batch) in train.epoch().enumerate() {
                let step_metrics = self.train_step(scope, &batch)?;
                debug!(
                    "epoch {epoch} step {step}: loss {:.4}",
                    step_metrics.mean_loss()
                );
                metrics += step_metrics;
            }

            if metrics.seen == 0 {
                return Err(ReplicaErr::EmptyDataset);
            }

            let (val_loss, val_accuracy) = match validation {
                Some(data) => {
                    let (loss, accuracy) = self.evaluate(scope, data)?;
                    (Some(loss), Some(accuracy))
                }
                None => (None, None),
            };

            let stats = EpochStats {
                epoch,
                loss: metrics.mean_loss(),
                accuracy: metrics.accuracy(),
                val_loss,
                val_accuracy,
                elapsed_ms: start.elapsed().as_millis() as u64,
            };

            match (val_loss, val_accuracy) {
                (Some(val_loss), Some(val_accuracy)) => info!(
                    "epoch {epoch}/{epochs} - loss: {:.4} - accuracy: {:.4} - val_loss: {val_loss:.4} - val_accuracy: {val_accuracy:.4}",
                    stats.loss, stats.accuracy
                ),
                _ => info!(
                    "epoch {epoch}/{epochs} - loss: {:.4} - accuracy: {:.4}",
                    stats.loss, stats.accuracy
                ),
            }

            on_epoch(&stats);
            history.push(stats);
        }

        Ok(history)
    }

    /// Measures the model over every batch of `data`, without training it.
    ///
    /// # Returns
    /// The sample weighted `(loss, accuracy)`, or an error if `data` has no batches.
    pub fn evaluate(
        &mut self,
        scope: &StrategyScope<'_>,
        data: &dyn BatchSource,
    ) -> Result<(f32, f32)> {
        scope.check(self.owner)?;
        let mut metrics = BatchMetrics::default();

        for batch in data.epoch() {
            metrics += self.eval_step(scope, &batch)?;
        }

        if metrics.seen == 0 {
            return Err(ReplicaErr::EmptyDataset);
        }

        Ok((metrics.mean_loss(), metrics.accuracy()))
    }

    fn train_step(&mut self, scope: &StrategyScope<'_>, batch: &Batch) -> Result<BatchMetrics> {
        let shards = shard::split(batch, self.replicas.len())?;
        let params = &self.params;
        let loss_fn = &self.loss_fn;
        let replicas = &mut self.replicas;

        let outcomes: Vec<_> = scope.install(|| {
            replicas
                .par_iter_mut()
                .zip(shards)
                .map(|(replica, shard)| {
                    replica.model.backprop(
                        params,
                        &mut replica.grad,
                        loss_fn,
                        shard.images.into_dyn(),
                        shard.labels,
                    )
                })
                .collect()
        });

        let mut metrics = BatchMetrics::default();
        for outcome in outcomes {
            metrics += outcome?;
        }

        let grads: Vec<_> = self.replicas.iter().map(|r| r.grad.as_slice()).collect();
        let mean = &mut self.grad;
        scope.install(|| ensemble::all_reduce_mean(&grads, mean))?;

        self.optimizer.update_params(&self.grad, &mut self.params)?;
        Ok(metrics)
    }

    fn eval_step(&mut self, scope: &StrategyScope<'_>, batch: &Batch) -> Result<BatchMetrics> {
        let shards = shard::split(batch, self.replicas.len())?;
        let params = &self.params;
        let loss_fn = &self.loss_fn;
        let replicas = &mut self.replicas;

        let outcomes: Vec<_> = scope.install(|| {
            replicas
                .par_iter_mut()
                .zip(shards)
                .map(|(replica, shard)| {
                    replica.model.evaluate(
                        params,
                        loss_fn,
                        shard.images.into_dyn(),
                        shard.labels,
                    )
                })
                .collect()
        });

        let mut metrics = BatchMetrics::default();
        for outcome in outcomes {
            metrics += outcome?;
        }

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::{
        arch::{activations::ActFn, layers::Layer, loss::SparseCategoricalCrossentropy},
        optimization::Adam,
    };
    use ndarray::{Array1, Array4};

    use super::*;
    use crate::resolver::{LocalClusterResolver, resolve_strategy};

    struct Fixed(Vec<Batch>);

    impl BatchSource for Fixed {
        fn epoch(&self) -> Box<dyn Iterator<Item = Batch> + '_> {
            Box::new(self.0.iter().cloned())
        }

        fn num_batches(&self) -> usize {
            self.0.len()
        }
    }

    /// Images whose class is the bright quadrant row, 0 for the top half and 1 for the bottom.
    fn halves(n: usize) -> Batch {
        let images = Array4::from_shape_fn((n, 4, 4, 1), |(i, r, _, _)| {
            let top = i % 2 == 0;
            if (r < 2) == top { 1. } else { 0. }
        });
        let labels = Array1::from_shape_fn(n, |i| i % 2);

        Batch::new(images, labels).unwrap()
    }

    fn net() -> Sequential {
        let layers = [
            Layer::flatten(),
            Layer::dense((16, 8), Some(ActFn::relu())),
            Layer::dropout(0.25).unwrap(),
            Layer::dense((8, 2), None),
            Layer::softmax(),
        ];

        Sequential::new(&[4, 4, 1], layers).unwrap()
    }

    fn compile(
        scope: &StrategyScope<'_>,
        seed: u64,
    ) -> DistributedModel<SparseCategoricalCrossentropy, Adam> {
        scope
            .compile(
                net(),
                SparseCategoricalCrossentropy::new(),
                |size| Adam::with_learning_rate(size, 1e-2),
                Some(seed),
            )
            .unwrap()
    }

    #[test]
    fn fit_learns_a_separable_task() {
        let strategy = resolve_strategy(&LocalClusterResolver::new(Some(2))).unwrap();
        let scope = strategy.scope();
        let mut model = compile(&scope, 7);

        let train = Fixed(vec![halves(8); 4]);
        let test = Fixed(vec![halves(4)]);

        let mut seen = Vec::new();
        let history = model
            .fit(&scope, &train, 20, Some(&test), |stats| seen.push(stats.epoch))
            .unwrap();

        assert_eq!(history.len(), 20);
        assert_eq!(seen, (1..=20).collect::<Vec<_>>());

        let first = history.epochs()[0];
        let last = history.last().unwrap();
        assert!(last.loss < first.loss);
        assert!(last.val_loss.is_some());

        let (loss, accuracy) = model.evaluate(&scope, &test).unwrap();
        assert!(loss >= 0.);
        assert_eq!(accuracy, 1.);
    }

    #[test]
    fn seeds_decide_the_mirrored_parameters() {
        let strategy = resolve_strategy(&LocalClusterResolver::new(Some(1))).unwrap();
        let scope = strategy.scope();

        let a = compile(&scope, 1);
        let b = compile(&scope, 1);
        let c = compile(&scope, 2);

        assert_eq!(a.params(), b.params());
        assert_ne!(a.params(), c.params());
        assert_eq!(a.num_replicas(), 1);
    }

    #[test]
    fn foreign_scopes_are_rejected() {
        let resolver = LocalClusterResolver::new(Some(1));
        let owner = resolve_strategy(&resolver).unwrap();
        let other = resolve_strategy(&resolver).unwrap();
        let mut model = compile(&owner.scope(), 1);

        let data = Fixed(vec![halves(2)]);
        assert!(matches!(
            model.evaluate(&other.scope(), &data),
            Err(ReplicaErr::ForeignScope { .. })
        ));
        assert!(matches!(
            model.fit(&other.scope(), &data, 1, None, |_| {}),
            Err(ReplicaErr::ForeignScope { .. })
        ));
    }

    #[test]
    fn empty_and_uneven_data_are_errors() {
        let strategy = resolve_strategy(&LocalClusterResolver::new(Some(2))).unwrap();
        let scope = strategy.scope();
        let mut model = compile(&scope, 1);

        let empty = Fixed(vec![]);
        assert!(matches!(
            model.evaluate(&scope, &empty),
            Err(ReplicaErr::EmptyDataset)
        ));
        assert!(matches!(
            model.fit(&scope, &empty, 1, None, |_| {}),
            Err(ReplicaErr::EmptyDataset)
        ));

        let uneven = Fixed(vec![halves(3)]);
        assert!(matches!(
            model.fit(&scope, &uneven, 1, None, |_| {}),
            Err(ReplicaErr::UnevenShards { batch: 3, replicas: 2 })
        ));
    }

    #[test]
    fn replicas_agree_with_a_single_device() {
        // Without dropout, splitting a batch in two and averaging must match the full batch.
        let layers = [
            Layer::flatten(),
            Layer::dense((16, 3), None),
            Layer::softmax(),
        ];
        let model = Sequential::new(&[4, 4, 1], layers).unwrap();
        let data = Fixed(vec![halves(4)]);

        let one = resolve_strategy(&LocalClusterResolver::new(Some(1))).unwrap();
        let two = resolve_strategy(&LocalClusterResolver::new(Some(2))).unwrap();

        let compile = |scope: &StrategyScope<'_>| {
            scope
                .compile(
                    model.clone(),
                    SparseCategoricalCrossentropy::new(),
                    |size| Adam::with_learning_rate(size, 1e-2),
                    Some(3),
                )
                .unwrap()
        };

        let mut a = compile(&one.scope());
        let mut b = compile(&two.scope());
        a.fit(&one.scope(), &data, 3, None, |_| {}).unwrap();
        b.fit(&two.scope(), &data, 3, None, |_| {}).unwrap();

        for (x, y) in a.params().iter().zip(b.params()) {
            assert!((x - y).abs() < 1e-5, "{x} != {y}");
        }
    }
}
