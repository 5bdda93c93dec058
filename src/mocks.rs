use std::collections::HashSet;

use parking_lot::Mutex;

use crate::checkpoint::Checkpoint;
use crate::errors::{FxVideoError, Result};
use crate::traits::{CheckpointLoader, CurvePredictor};

/// Test predictor computing `slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockLinearModel {
    pub slope: f32,
    pub intercept: f32,
}

impl MockLinearModel {
    pub const fn new(slope: f32, intercept: f32) -> Self {
        Self { slope, intercept }
    }
}

impl CurvePredictor for MockLinearModel {
    fn predict(&self, xs: &[f32]) -> Result<Vec<f32>> {
        Ok(xs.iter().map(|x| self.slope * x + self.intercept).collect())
    }
}

/// Test loader whose models move towards `target_slope` as the epoch grows,
/// reaching it at `epochs_to_converge`.
#[derive(Debug, Default)]
pub struct MockCheckpointLoader {
    pub target_slope: f32,
    pub epochs_to_converge: u64,
    failing_epochs: HashSet<u64>,
    loaded: Mutex<Vec<u64>>,
}

impl MockCheckpointLoader {
    pub fn new(target_slope: f32, epochs_to_converge: u64) -> Self {
        Self {
            target_slope,
            epochs_to_converge: epochs_to_converge.max(1),
            ..Self::default()
        }
    }

    /// Makes loading the given epoch fail with a model error.
    pub fn failing_on(mut self, epoch: u64) -> Self {
        self.failing_epochs.insert(epoch);
        self
    }

    /// Epochs loaded so far, in load order.
    pub fn loaded_epochs(&self) -> Vec<u64> {
        self.loaded.lock().clone()
    }
}

impl CheckpointLoader for MockCheckpointLoader {
    type Predictor = MockLinearModel;

    fn load(&self, checkpoint: &Checkpoint) -> Result<MockLinearModel> {
        self.loaded.lock().push(checkpoint.epoch);
        if self.failing_epochs.contains(&checkpoint.epoch) {
            return Err(FxVideoError::model(
                format!("model load: {}", checkpoint.model_path.display()),
                "mock failure",
            ));
        }
        let progress = checkpoint.epoch.min(self.epochs_to_converge) as f32
            / self.epochs_to_converge as f32;
        Ok(MockLinearModel::new(self.target_slope * progress, 0.0))
    }
}
