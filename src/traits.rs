use crate::checkpoint::Checkpoint;
use crate::errors::Result;

/// Evaluates a one-variable model over a batch of inputs.
pub trait CurvePredictor: Send + Sync {
    /// Returns one prediction per input, in input order.
    fn predict(&self, xs: &[f32]) -> Result<Vec<f32>>;
}

/// Turns a checkpoint on disk into a predictor.
pub trait CheckpointLoader: Send + Sync {
    type Predictor: CurvePredictor;

    fn load(&self, checkpoint: &Checkpoint) -> Result<Self::Predictor>;
}
