pub mod config;
pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod stage;

pub use config::RunConfig;
pub use error::{ModelErr, TrainErr};
pub use observer::{LogObserver, Observer};
pub use orchestrator::{Classifier, Orchestrator, Report, evaluate, global_batch_size};
pub use stage::Stage;
