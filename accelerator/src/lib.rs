pub mod cluster;
pub mod ensemble;
pub mod error;
pub mod history;
pub mod resolver;
pub mod shard;
pub mod strategy;
pub mod trainer;

pub use cluster::Cluster;
pub use error::{AcceleratorErr, ReplicaErr};
pub use history::{EpochStats, History};
pub use resolver::{ClusterResolver, ClusterSpec, LocalClusterResolver, resolve_strategy};
pub use strategy::{ReplicaStrategy, StrategyScope};
pub use trainer::DistributedModel;
