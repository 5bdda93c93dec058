use std::path::Path;

use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;

use crate::{
    checkpoint::Checkpoint,
    errors::{FxVideoError, Result},
    traits::{CheckpointLoader, CurvePredictor},
};

/// A regression checkpoint loaded into ONNX Runtime.
///
/// The model takes a float32 input of shape `[N]` or `[N, 1]` and yields one
/// float32 per row.
pub struct OnnxModel {
    input_name: String,
    output_name: String,
    plan: BatchPlan,
    session: Mutex<Session>,
}

/// How a dataset is split into inference calls for one model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    input_rank: usize,
    batch_size: Option<usize>,
    fixed_batch: bool,
}

impl BatchPlan {
    /// Accepts `[N]` or `[N, 1]` inputs, where a negative `N` is dynamic.
    ///
    /// A positive `N` is the exported batch and wins over `requested`.
    pub fn from_input_shape(shape: &[i64], requested: Option<usize>) -> Result<Self> {
        let input_rank = shape.len();
        if !(1..=2).contains(&input_rank) || (input_rank == 2 && shape[1] > 1) {
            return Err(FxVideoError::model(
                "model input shape lookup",
                format!("expected input shape [N] or [N, 1], found {:?}", shape),
            ));
        }

        let exported_batch = usize::try_from(shape[0]).ok().filter(|&n| n > 0);
        let (batch_size, fixed_batch) = match (exported_batch, requested) {
            (Some(fixed), _) => (Some(fixed), true),
            (None, requested) => (requested.filter(|&n| n > 0), false),
        };
        Ok(Self {
            input_rank,
            batch_size,
            fixed_batch,
        })
    }

    /// Runs `infer` once per chunk and returns one prediction per input.
    ///
    /// Fixed-batch chunks are zero-padded to the batch size and the padding
    /// rows are dropped from the output. `infer` may return any shape holding
    /// exactly one value per row, such as `[N]` or `[N, 1]`.
    pub fn predict_with<F>(&self, xs: &[f32], mut infer: F) -> Result<Vec<f32>>
    where
        F: FnMut(ArrayD<f32>) -> Result<ArrayD<f32>>,
    {
        let chunk_size = self.batch_size.unwrap_or(xs.len()).max(1);
        let mut predictions = Vec::with_capacity(xs.len());
        for chunk in xs.chunks(chunk_size) {
            let rows = chunk.len();
            let padded_rows = if self.fixed_batch { chunk_size } else { rows };
            let mut data = chunk.to_vec();
            data.resize(padded_rows, 0.0);

            let input = if self.input_rank == 1 {
                Array1::from_vec(data).into_dyn()
            } else {
                Array2::from_shape_vec((padded_rows, 1), data)?.into_dyn()
            };

            let output = infer(input)?;
            if output.len() != padded_rows {
                return Err(FxVideoError::model(
                    "inference output check",
                    format!(
                        "expected {} predictions, model returned shape {:?}",
                        padded_rows,
                        output.shape()
                    ),
                ));
            }
            predictions.extend(output.iter().take(rows).copied());
        }
        Ok(predictions)
    }
}

impl OnnxModel {
    pub fn new(model_path: &Path, device_id: i32, batch_size: Option<usize>) -> Result<Self> {
        let session = SessionBuilder::new()
            .map_err(|e| FxVideoError::model("session builder init", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| FxVideoError::model("execution provider setup", e))?
            .with_memory_pattern(true)
            .map_err(|e| FxVideoError::model("memory pattern setup", e))?
            .commit_from_file(model_path)
            .map_err(|e| {
                FxVideoError::model(format!("model load: {}", model_path.display()), e)
            })?;

        if session.inputs.len() != 1 || session.outputs.is_empty() {
            return Err(FxVideoError::model(
                format!("model signature check: {}", model_path.display()),
                format!(
                    "expected one input and at least one output, found {} and {}",
                    session.inputs.len(),
                    session.outputs.len()
                ),
            ));
        }

        let shape = session.inputs[0]
            .input_type
            .tensor_shape()
            .ok_or_else(|| {
                FxVideoError::model("model input shape lookup", "input is not a tensor")
            })?;
        let plan = BatchPlan::from_input_shape(&shape[..], batch_size)?;

        Ok(Self {
            input_name: session.inputs[0].name.clone(),
            output_name: session.outputs[0].name.clone(),
            plan,
            session: Mutex::new(session),
        })
    }

    fn infer(&self, input: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&input)?
        ])?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .to_owned())
    }
}

impl CurvePredictor for OnnxModel {
    fn predict(&self, xs: &[f32]) -> Result<Vec<f32>> {
        self.plan.predict_with(xs, |input| self.infer(input))
    }
}

/// Loads every checkpoint with the same device and batching settings.
#[derive(Debug, Clone, Default)]
pub struct OnnxLoader {
    pub device_id: i32,
    pub batch_size: Option<usize>,
}

impl OnnxLoader {
    pub const fn new(device_id: i32, batch_size: Option<usize>) -> Self {
        Self {
            device_id,
            batch_size,
        }
    }
}

impl CheckpointLoader for OnnxLoader {
    type Predictor = OnnxModel;

    fn load(&self, checkpoint: &Checkpoint) -> Result<OnnxModel> {
        OnnxModel::new(&checkpoint.model_path, self.device_id, self.batch_size)
    }
}
