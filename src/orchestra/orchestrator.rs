use accelerator::{ClusterResolver, DistributedModel, History, ReplicaStrategy, resolve_strategy};
use datasets::{DataErr, DatasetProvider, load_and_preprocess};
use log::info;
use machine_learning::{
    arch::{builder, loss::SparseCategoricalCrossentropy},
    dataset::BatchSource,
    optimization::Adam,
};
use serde::Serialize;

use super::{config::RunConfig, error::TrainErr, observer::Observer, stage::Stage};

/// The compiled image classifier.
pub type Classifier = DistributedModel<SparseCategoricalCrossentropy, Adam>;

/// What a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub replicas: usize,
    pub global_batch_size: usize,
    pub history: History,
    /// The test `(loss, accuracy)`, if evaluation was requested.
    pub evaluation: Option<(f32, f32)>,
}

/// Computes the size of the batches the whole cluster works on in a single step.
///
/// # Returns
/// `per_replica * replicas`, or an error if it overflows or either is zero.
pub fn global_batch_size(per_replica: usize, replicas: usize) -> Result<usize, TrainErr> {
    match per_replica.checked_mul(replicas) {
        Some(size) if size > 0 => Ok(size),
        _ => Err(TrainErr::DataPipeline(DataErr::InvalidBatchSize)),
    }
}

/// Evaluates `model` on every batch of `dataset` within the scope of `strategy`.
///
/// # Returns
/// The sample weighted `(loss, accuracy)`.
pub fn evaluate(
    strategy: &ReplicaStrategy,
    model: &mut Classifier,
    dataset: &dyn BatchSource,
) -> Result<(f32, f32), TrainErr> {
    let scope = strategy.scope();
    Ok(model.evaluate(&scope, dataset)?)
}

/// Drives a whole training run: resolve the accelerator, load the data, build and compile the
/// model inside the strategy's scope, fit it and evaluate it.
pub struct Orchestrator<O: Observer> {
    config: RunConfig,
    observer: O,
    stage: Stage,
}

impl<O: Observer> Orchestrator<O> {
    /// Creates a new `Orchestrator`.
    ///
    /// # Arguments
    /// * `config` - The run's configuration.
    /// * `observer` - Gets told about the run's progress.
    pub fn new(config: RunConfig, observer: O) -> Self {
        Self {
            config,
            observer,
            stage: Stage::ResolvingAccelerator,
        }
    }

    /// Returns the stage the run is in, or ended at.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Runs every stage once, in order, stopping at the first failure.
    ///
    /// # Arguments
    /// * `resolver` - Finds the accelerator cluster.
    /// * `provider` - Fetches the dataset.
    ///
    /// # Returns
    /// The run's report or the error of the stage that failed.
    pub fn run<R, P>(&mut self, resolver: &R, provider: &P) -> Result<Report, TrainErr>
    where
        R: ClusterResolver + ?Sized,
        P: DatasetProvider + ?Sized,
    {
        match self.stages(resolver, provider) {
            Ok(report) => {
                self.stage = Stage::Done;
                self.observer.done(&report);
                Ok(report)
            }
            Err(e) => {
                self.observer.failed(self.stage, &e);
                self.stage = Stage::Failed;
                Err(e)
            }
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.observer.stage(stage);
    }

    fn stages<R, P>(&mut self, resolver: &R, provider: &P) -> Result<Report, TrainErr>
    where
        R: ClusterResolver + ?Sized,
        P: DatasetProvider + ?Sized,
    {
        self.enter(Stage::ResolvingAccelerator);
        let strategy = resolve_strategy(resolver)?;
        let replicas = strategy.num_replicas_in_sync();

        self.enter(Stage::LoadingData);
        let batch_size = global_batch_size(self.config.batch_size_per_replica.get(), replicas)?;
        info!("Global batch size: {batch_size} (Replicas: {replicas})");
        let shuffle_seed = self.config.seed.unwrap_or_else(rand_seed);
        let data = load_and_preprocess(provider, &self.config.dataset, batch_size, shuffle_seed)?;

        self.enter(Stage::Building);
        let scope = strategy.scope();
        let learning_rate = self.config.learning_rate;
        let model = builder::conv_net(data.info.image_shape, data.info.num_classes)?;
        let mut model: Classifier = scope.compile(
            model,
            SparseCategoricalCrossentropy::new(),
            |size| Adam::with_learning_rate(size, learning_rate),
            self.config.seed,
        )?;
        info!("compiled a model with {} parameters", model.size());

        self.enter(Stage::Training);
        let observer = &mut self.observer;
        let history = model.fit(
            &scope,
            &data.train,
            self.config.epochs.get(),
            Some(&data.test),
            |stats| observer.epoch(stats),
        )?;

        let evaluation = if self.config.evaluate {
            self.enter(Stage::Evaluating);
            Some(evaluate(&strategy, &mut model, &data.test)?)
        } else {
            None
        };

        Ok(Report {
            replicas,
            global_batch_size: batch_size,
            history,
            evaluation,
        })
    }
}

fn rand_seed() -> u64 {
    rand::random()
}
