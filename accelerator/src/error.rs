use std::{error::Error, fmt};

use machine_learning::MlErr;

/// The result type for resolving and initializing a cluster.
pub type Result<T> = std::result::Result<T, AcceleratorErr>;

/// Failures while resolving, connecting to or initializing a replica cluster.
#[derive(Debug)]
pub enum AcceleratorErr {
    NotFound {
        name: String,
    },
    InvalidTopology {
        replicas: usize,
    },
    Connect(String),
    RuntimeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
}

impl fmt::Display for AcceleratorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceleratorErr::NotFound { name } => write!(f, "cluster {name} not found"),
            AcceleratorErr::InvalidTopology { replicas } => {
                write!(f, "invalid cluster topology: {replicas} replicas")
            }
            AcceleratorErr::Connect(e) => write!(f, "failed to connect to the cluster: {e}"),
            AcceleratorErr::RuntimeMismatch { expected, got } => write!(
                f,
                "replica runtime mismatch: expected replicas {expected:?}, got {got:?}"
            ),
        }
    }
}

impl Error for AcceleratorErr {}

/// Failures while compiling, fitting or evaluating a replicated model.
#[derive(Debug)]
pub enum ReplicaErr {
    Ml(MlErr),
    ForeignScope {
        expected: u64,
        got: u64,
    },
    UnevenShards {
        batch: usize,
        replicas: usize,
    },
    EmptyDataset,
}

impl fmt::Display for ReplicaErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaErr::Ml(e) => write!(f, "{e}"),
            ReplicaErr::ForeignScope { expected, got } => write!(
                f,
                "the model belongs to strategy {expected} but was used within the scope of strategy {got}"
            ),
            ReplicaErr::UnevenShards { batch, replicas } => write!(
                f,
                "a batch of {batch} samples can't be split evenly across {replicas} replicas"
            ),
            ReplicaErr::EmptyDataset => write!(f, "the dataset yielded no batches"),
        }
    }
}

impl Error for ReplicaErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReplicaErr::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for ReplicaErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}
