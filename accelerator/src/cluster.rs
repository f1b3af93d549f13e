use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    error::{AcceleratorErr, Result},
    resolver::ClusterSpec,
    strategy::ReplicaStrategy,
};

/// A connected, not yet initialized, cluster of replicas.
///
/// Every replica is a dedicated thread of the cluster's pool.
#[derive(Debug)]
pub struct Cluster {
    spec: ClusterSpec,
    pool: ThreadPool,
}

impl Cluster {
    /// Connects to the cluster described by `spec`, spawning one named thread per replica.
    ///
    /// # Returns
    /// The connected cluster or an error if the replicas couldn't be started.
    pub fn connect(spec: ClusterSpec) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(spec.replicas.get())
            .thread_name(|i| format!("replica-{i}"))
            .build()
            .map_err(|e| AcceleratorErr::Connect(e.to_string()))?;

        debug!("connected to {} replicas", spec.replicas);
        Ok(Self { spec, pool })
    }

    /// Initializes the replica runtime. Consuming the cluster makes this happen only once.
    ///
    /// Every replica must answer a broadcast with its own index.
    ///
    /// # Returns
    /// The strategy for the cluster or an error if the replicas don't match the spec.
    pub fn initialize(self) -> Result<ReplicaStrategy> {
        let expected: Vec<_> = (0..self.spec.replicas.get()).collect();
        let got = self.pool.broadcast(|ctx| ctx.index());

        if got != expected {
            return Err(AcceleratorErr::RuntimeMismatch { expected, got });
        }

        Ok(ReplicaStrategy::new(self.spec, self.pool))
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;

    #[test]
    fn every_replica_answers_with_its_index() {
        let spec = ClusterSpec {
            name: "local".to_string(),
            replicas: NonZeroUsize::new(4).unwrap(),
        };

        let cluster = Cluster::connect(spec).unwrap();
        let strategy = cluster.initialize().unwrap();
        assert_eq!(strategy.num_replicas_in_sync(), 4);
        assert_eq!(strategy.cluster_name(), "local");
    }
}
