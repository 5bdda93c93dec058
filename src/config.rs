use std::path::{Path, PathBuf};
use std::thread;

use clap::{Parser, ValueEnum};

use crate::animation::MAX_FPS;
use crate::errors::FxVideoError;
use crate::render::MAX_FRAME_SIDE;

/// Ordering applied to checkpoint directory entries.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckpointOrder {
    /// Plain file-name sort; matches epoch order only for zero-padded names.
    #[default]
    Lexical,
    /// Sort by the parsed epoch number.
    Numeric,
}

#[derive(Parser, Clone, Debug)]
#[command(
    version,
    about = "Generates an animated gif that shows the prediction curve computed on a dataset as the epochs change",
    long_about = None
)]
pub struct Config {
    /// Model snapshots directory, one ONNX checkpoint per epoch
    #[arg(long = "modelsnap")]
    pub model_snapshots_path: PathBuf,

    /// Dataset file (two-column csv, no header)
    #[arg(long = "ds")]
    pub dataset_path: PathBuf,

    /// The animated .gif file to generate
    #[arg(long = "savevideo", value_parser = check_gif_path)]
    pub output_path: PathBuf,

    /// Frames per second, at most 100 (GIF delays are whole centiseconds)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=MAX_FPS as i64))]
    pub fps: u32,

    /// Width of the animated gif (in inches)
    #[arg(long, default_value_t = 9.0, value_parser = check_inches)]
    pub width: f32,

    /// Height of the animated gif (in inches)
    #[arg(long, default_value_t = 6.0, value_parser = check_inches)]
    pub height: f32,

    /// Pixels per inch
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    pub dpi: u32,

    #[arg(long, value_enum, default_value_t = CheckpointOrder::Lexical)]
    pub order: CheckpointOrder,

    /// Rows per inference call; defaults to the model's fixed batch size or the whole dataset
    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(short, long, default_value_t = default_threads())]
    pub num_threads: usize,

    /// GIF quantizer speed, 1 (best) to 30 (fastest)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(i32).range(1..=30))]
    pub gif_speed: i32,
}

impl Config {
    /// Frame dimensions in pixels, at most `MAX_FRAME_SIDE` per side.
    pub fn frame_size(&self) -> Result<(u32, u32), FxVideoError> {
        let to_px = |field: &str, inches: f32| {
            let px = (f64::from(inches) * f64::from(self.dpi)).round().max(1.0);
            if px > f64::from(MAX_FRAME_SIDE) {
                return Err(FxVideoError::validation(
                    field,
                    format!(
                        "{} in at {} dpi is {} px, more than the {} px a gif frame allows",
                        inches, self.dpi, px, MAX_FRAME_SIDE
                    ),
                ));
            }
            Ok(px as u32)
        };
        Ok((to_px("width", self.width)?, to_px("height", self.height)?))
    }
}

fn default_threads() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

fn check_gif_path(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    match Path::new(s).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("gif") => Ok(path),
        _ => Err(format!("{} is not supported. Output must be a `.gif` file", s)),
    }
}

fn check_inches(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("{} is not a number", s))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{} must be a positive size in inches", s));
    }
    Ok(value)
}
