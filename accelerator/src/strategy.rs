use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use machine_learning::{
    arch::{Sequential, loss::LossFn},
    optimization::Optimizer,
};
use rayon::ThreadPool;

use crate::{error::ReplicaErr, resolver::ClusterSpec, trainer::DistributedModel};

static NEXT_STRATEGY_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
struct Runtime {
    id: u64,
    spec: ClusterSpec,
    pool: ThreadPool,
}

/// A handle to an initialized replica runtime.
///
/// Cloning the handle shares the same runtime, which gets released once the last handle is
/// dropped.
#[derive(Debug, Clone)]
pub struct ReplicaStrategy {
    runtime: Arc<Runtime>,
}

impl ReplicaStrategy {
    pub(crate) fn new(spec: ClusterSpec, pool: ThreadPool) -> Self {
        let id = NEXT_STRATEGY_ID.fetch_add(1, Ordering::Relaxed);

        Self {
            runtime: Arc::new(Runtime { id, spec, pool }),
        }
    }

    pub fn id(&self) -> u64 {
        self.runtime.id
    }

    pub fn cluster_name(&self) -> &str {
        &self.runtime.spec.name
    }

    /// Returns the amount of replicas that take part in every training step.
    pub fn num_replicas_in_sync(&self) -> usize {
        self.runtime.spec.replicas.get()
    }

    /// Enters the strategy's scope, the only place where replicated models can be created,
    /// fitted and evaluated.
    pub fn scope(&self) -> StrategyScope<'_> {
        StrategyScope { strategy: self }
    }
}

/// The capability to create and run replicated models on a strategy.
#[derive(Debug, Clone, Copy)]
pub struct StrategyScope<'s> {
    strategy: &'s ReplicaStrategy,
}

impl StrategyScope<'_> {
    pub fn strategy_id(&self) -> u64 {
        self.strategy.id()
    }

    pub fn num_replicas(&self) -> usize {
        self.strategy.num_replicas_in_sync()
    }

    /// Creates the mirrored parameters of `model` and binds it to this scope's strategy.
    ///
    /// # Arguments
    /// * `model` - The network to train, still without parameters.
    /// * `loss_fn` - The loss function to minimize.
    /// * `optimizer_factory` - Creates the optimizer for the given amount of parameters.
    /// * `seed` - Seeds the parameters and the replicas' dropout, or `None` for OS entropy.
    ///
    /// # Returns
    /// The compiled model or an error if its parameters couldn't be created.
    pub fn compile<L, O, F>(
        &self,
        model: Sequential,
        loss_fn: L,
        optimizer_factory: F,
        seed: Option<u64>,
    ) -> Result<DistributedModel<L, O>, ReplicaErr>
    where
        L: LossFn + Sync,
        O: Optimizer,
        F: FnOnce(usize) -> machine_learning::Result<O>,
    {
        DistributedModel::new(self, model, loss_fn, optimizer_factory, seed)
    }

    pub(crate) fn check(&self, owner: u64) -> Result<(), ReplicaErr> {
        let got = self.strategy_id();

        if got != owner {
            return Err(ReplicaErr::ForeignScope {
                expected: owner,
                got,
            });
        }

        Ok(())
    }

    /// Runs `op` within the replicas' thread pool.
    pub(crate) fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.strategy.runtime.pool.install(op)
    }
}
