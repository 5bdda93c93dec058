pub mod animation;
pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod model;
pub mod render;
pub mod traits;

pub mod mocks;

use std::path::PathBuf;

use image::RgbImage;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;

pub use checkpoint::{discover_checkpoints, Checkpoint};
pub use config::{CheckpointOrder, Config};
pub use dataset::{Dataset, PlotBounds};
pub use errors::{FxVideoError, Result};
pub use model::{OnnxLoader, OnnxModel};
pub use render::FrameRenderer;
pub use traits::*;

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSummary {
    pub output: PathBuf,
    pub frames: usize,
    pub width: u32,
    pub height: u32,
}

/// Renders one frame per checkpoint and assembles them into a GIF.
pub struct VideoGenerator<L: CheckpointLoader> {
    loader: L,
    config: Config,
    show_progress: bool,
}

impl<L: CheckpointLoader> VideoGenerator<L> {
    pub const fn new(loader: L, config: Config) -> Self {
        Self {
            loader,
            config,
            show_progress: true,
        }
    }

    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub const fn loader(&self) -> &L {
        &self.loader
    }

    pub fn run(&self) -> Result<VideoSummary> {
        let dataset = Dataset::from_csv(&self.config.dataset_path)?;
        let checkpoints =
            discover_checkpoints(&self.config.model_snapshots_path, self.config.order)?;
        tracing::info!(
            samples = dataset.len(),
            checkpoints = checkpoints.len(),
            "inputs loaded"
        );

        let frames = self.render_frames(&dataset, &checkpoints)?;
        let (width, height) = self.config.frame_size()?;
        let count = frames.len();

        animation::encode_gif(
            &self.config.output_path,
            frames,
            self.config.fps,
            self.config.gif_speed,
        )?;
        tracing::info!(path = %self.config.output_path.display(), frames = count, "saved animated gif");

        Ok(VideoSummary {
            output: self.config.output_path.clone(),
            frames: count,
            width,
            height,
        })
    }

    /// Frames come back in checkpoint order whatever the thread count.
    pub fn render_frames(
        &self,
        dataset: &Dataset,
        checkpoints: &[Checkpoint],
    ) -> Result<Vec<RgbImage>> {
        let (width, height) = self.config.frame_size()?;
        let renderer = FrameRenderer::new(width, height);
        let bounds = dataset.bounds();
        let xs: Vec<f32> = dataset.xs().iter().map(|&x| x as f32).collect();

        let progress_bar = if self.show_progress {
            ProgressBar::new(checkpoints.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        progress_bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .map_err(|e| FxVideoError::Configuration {
                message: e.to_string(),
            })?
            .progress_chars("#>-"),
        );

        let frames = checkpoints
            .par_iter()
            .progress_with(progress_bar.clone())
            .map(|checkpoint| -> Result<RgbImage> {
                let frame = self.render_checkpoint(checkpoint, dataset, &xs, &bounds, &renderer)?;
                tracing::debug!(epoch = checkpoint.epoch, entry = %checkpoint.name, "generated frame");
                Ok(frame)
            })
            .collect::<Result<Vec<_>>>()?;

        progress_bar.finish();
        Ok(frames)
    }

    fn render_checkpoint(
        &self,
        checkpoint: &Checkpoint,
        dataset: &Dataset,
        xs: &[f32],
        bounds: &PlotBounds,
        renderer: &FrameRenderer,
    ) -> Result<RgbImage> {
        let model = self.loader.load(checkpoint)?;
        let predictions = model.predict(xs)?;
        renderer.render(checkpoint.epoch, dataset, &predictions, bounds)
    }
}

impl VideoGenerator<OnnxLoader> {
    pub fn with_onnx_models(config: Config) -> Self {
        let loader = OnnxLoader::new(config.device_id, config.batch_size);
        Self::new(loader, config)
    }
}
