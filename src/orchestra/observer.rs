use accelerator::EpochStats;
use log::{debug, error, info, warn};

use super::{error::TrainErr, orchestrator::Report, stage::Stage};

/// Gets told about the progress of a training run.
pub trait Observer {
    /// A stage started.
    fn stage(&mut self, stage: Stage);

    /// An epoch finished.
    fn epoch(&mut self, stats: &EpochStats);

    /// The run failed during `stage`.
    fn failed(&mut self, stage: Stage, err: &TrainErr);

    /// The run finished successfully.
    fn done(&mut self, report: &Report);
}

/// Forwards every event to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn stage(&mut self, stage: Stage) {
        info!("stage: {stage}");
    }

    fn epoch(&mut self, stats: &EpochStats) {
        if let Ok(json) = serde_json::to_string(stats) {
            debug!("epoch stats: {json}");
        }
    }

    fn failed(&mut self, stage: Stage, err: &TrainErr) {
        error!("{stage} failed: {err}");
    }

    fn done(&mut self, report: &Report) {
        match report.evaluation {
            Some((loss, accuracy)) => info!("test loss: {loss:.4} - test accuracy: {accuracy:.4}"),
            None => warn!("training finished without evaluating"),
        }

        match serde_json::to_string(&report.history) {
            Ok(json) => info!("history: {json}"),
            Err(e) => warn!("failed to serialize the history: {e}"),
        }
    }
}
