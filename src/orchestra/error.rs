use std::{error::Error, fmt};

use accelerator::{AcceleratorErr, ReplicaErr};
use datasets::DataErr;
use machine_learning::MlErr;

/// Everything that can go wrong building or running the model, without telling them apart.
#[derive(Debug)]
pub enum ModelErr {
    Ml(MlErr),
    Replica(ReplicaErr),
}

impl fmt::Display for ModelErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelErr::Ml(e) => write!(f, "{e}"),
            ModelErr::Replica(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ModelErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelErr::Ml(e) => Some(e),
            ModelErr::Replica(e) => Some(e),
        }
    }
}

/// A training run failure, one kind per stage that can fail.
#[derive(Debug)]
pub enum TrainErr {
    AcceleratorInit(AcceleratorErr),
    DataPipeline(DataErr),
    ModelOrTraining(ModelErr),
}

impl fmt::Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::AcceleratorInit(e) => write!(f, "accelerator initialization failed: {e}"),
            TrainErr::DataPipeline(e) => write!(f, "data pipeline failed: {e}"),
            TrainErr::ModelOrTraining(e) => write!(f, "model or training failed: {e}"),
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainErr::AcceleratorInit(e) => Some(e),
            TrainErr::DataPipeline(e) => Some(e),
            TrainErr::ModelOrTraining(e) => Some(e),
        }
    }
}

impl From<AcceleratorErr> for TrainErr {
    fn from(value: AcceleratorErr) -> Self {
        Self::AcceleratorInit(value)
    }
}

impl From<DataErr> for TrainErr {
    fn from(value: DataErr) -> Self {
        Self::DataPipeline(value)
    }
}

impl From<MlErr> for TrainErr {
    fn from(value: MlErr) -> Self {
        Self::ModelOrTraining(ModelErr::Ml(value))
    }
}

impl From<ReplicaErr> for TrainErr {
    fn from(value: ReplicaErr) -> Self {
        Self::ModelOrTraining(ModelErr::Replica(value))
    }
}
