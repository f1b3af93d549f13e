use std::fmt;

/// The stages of a training run, in the order they happen.
///
/// `Failed` can follow any stage but `Done`, and nothing follows `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolvingAccelerator,
    LoadingData,
    Building,
    Training,
    Evaluating,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::ResolvingAccelerator => "resolving accelerator",
            Stage::LoadingData => "loading data",
            Stage::Building => "building model",
            Stage::Training => "training",
            Stage::Evaluating => "evaluating",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };

        f.write_str(s)
    }
}
