use serde::{Deserialize, Serialize};

/// The metrics of a single training epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
    pub elapsed_ms: u64,
}

/// Every epoch of a `fit`, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    epochs: Vec<EpochStats>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stats: EpochStats) {
        self.epochs.push(stats);
    }

    pub fn epochs(&self) -> &[EpochStats] {
        &self.epochs
    }

    pub fn last(&self) -> Option<&EpochStats> {
        self.epochs.last()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_every_epoch() {
        let mut history = History::new();
        history.push(EpochStats {
            epoch: 1,
            loss: 0.5,
            accuracy: 0.75,
            val_loss: None,
            val_accuracy: None,
            elapsed_ms: 12,
        });

        let json = serde_json::to_string(&history).unwrap();
        assert!(json.contains("\"epoch\":1"));
        assert!(json.contains("\"val_loss\":null"));

        let back: History = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }
}
