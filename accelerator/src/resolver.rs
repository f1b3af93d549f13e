use std::{num::NonZeroUsize, thread};

use log::info;

use crate::{
    cluster::Cluster,
    error::{AcceleratorErr, Result},
    strategy::ReplicaStrategy,
};

/// The name of the cluster living in the current process.
pub const LOCAL_CLUSTER: &str = "local";

/// What a resolver found: a named cluster and how many replicas it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    pub name: String,
    pub replicas: NonZeroUsize,
}

/// Discovers the cluster reachable from this process.
pub trait ClusterResolver {
    /// Finds the cluster.
    ///
    /// # Returns
    /// The cluster spec or an error if there's no usable cluster.
    fn resolve(&self) -> Result<ClusterSpec>;
}

/// Resolves a cluster made of CPU replicas in the current process.
#[derive(Debug, Clone, Default)]
pub struct LocalClusterResolver {
    replicas: Option<usize>,
}

impl LocalClusterResolver {
    /// Creates a new `LocalClusterResolver`.
    ///
    /// # Arguments
    /// * `replicas` - The amount of replicas, or `None` to use one per available core.
    pub fn new(replicas: Option<usize>) -> Self {
        Self { replicas }
    }
}

impl ClusterResolver for LocalClusterResolver {
    fn resolve(&self) -> Result<ClusterSpec> {
        let replicas = match self.replicas {
            Some(n) => n,
            None => thread::available_parallelism()
                .map(NonZeroUsize::get)
                .map_err(|e| AcceleratorErr::Connect(e.to_string()))?,
        };

        let replicas =
            NonZeroUsize::new(replicas).ok_or(AcceleratorErr::InvalidTopology { replicas })?;

        Ok(ClusterSpec {
            name: LOCAL_CLUSTER.to_string(),
            replicas,
        })
    }
}

/// Resolves, connects to and initializes a cluster, exactly once and without retries.
///
/// # Arguments
/// * `resolver` - Where to look for the cluster.
///
/// # Returns
/// The strategy to train with, or the first error found along the way.
pub fn resolve_strategy<R>(resolver: &R) -> Result<ReplicaStrategy>
where
    R: ClusterResolver + ?Sized,
{
    let spec = resolver.resolve()?;
    info!("running on cluster: {} ({} replicas)", spec.name, spec.replicas);

    let strategy = Cluster::connect(spec)?.initialize()?;
    info!("replica strategy initialized");

    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_replicas_win() {
        let spec = LocalClusterResolver::new(Some(3)).resolve().unwrap();

        assert_eq!(spec.name, LOCAL_CLUSTER);
        assert_eq!(spec.replicas.get(), 3);
    }

    #[test]
    fn defaults_to_available_parallelism() {
        let spec = LocalClusterResolver::default().resolve().unwrap();
        assert!(spec.replicas.get() >= 1);
    }

    #[test]
    fn zero_replicas_is_an_invalid_topology() {
        let err = LocalClusterResolver::new(Some(0)).resolve().unwrap_err();
        assert!(matches!(err, AcceleratorErr::InvalidTopology { replicas: 0 }));
    }

    #[test]
    fn resolution_errors_surface_untouched() {
        struct Missing;

        impl ClusterResolver for Missing {
            fn resolve(&self) -> Result<ClusterSpec> {
                Err(AcceleratorErr::NotFound {
                    name: "grpc://10.0.0.1:8470".to_string(),
                })
            }
        }

        assert!(matches!(
            resolve_strategy(&Missing),
            Err(AcceleratorErr::NotFound { .. })
        ));
    }

    #[test]
    fn resolves_a_ready_strategy() {
        let strategy = resolve_strategy(&LocalClusterResolver::new(Some(2))).unwrap();
        assert_eq!(strategy.num_replicas_in_sync(), 2);
    }
}
