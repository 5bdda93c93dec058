use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbImage;
use plotters::prelude::*;

use crate::dataset::{Dataset, PlotBounds};
use crate::errors::{FxVideoError, Result};

const TITLE_COLOR: RGBColor = RGBColor(255, 165, 0);
const TRUTH_COLOR: RGBColor = BLUE;
const PREDICTION_COLOR: RGBColor = RED;
const POINT_SIZE: u32 = 1;

/// GIF stores frame dimensions as 16-bit values.
pub const MAX_FRAME_SIDE: u32 = u16::MAX as u32;

/// Draws one scatter frame per epoch at a fixed pixel size.
#[derive(Debug)]
pub struct FrameRenderer {
    width: u32,
    height: u32,
    text_disabled: AtomicBool,
}

impl FrameRenderer {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text_disabled: AtomicBool::new(false),
        }
    }

    /// Ground truth in blue, predictions in red, axes fixed to `bounds`.
    ///
    /// Falls back to a text-free frame when no font can be rasterised, so a
    /// host without system fonts still produces an animation.
    pub fn render(
        &self,
        epoch: u64,
        dataset: &Dataset,
        predictions: &[f32],
        bounds: &PlotBounds,
    ) -> Result<RgbImage> {
        if predictions.len() != dataset.len() {
            return Err(FxVideoError::validation(
                "predictions",
                format!(
                    "has {} values for {} samples at epoch {}",
                    predictions.len(),
                    dataset.len(),
                    epoch
                ),
            ));
        }
        frame_buffer_len(self.width, self.height)?;

        if !self.text_disabled.load(Ordering::Relaxed) {
            match self.draw(epoch, dataset, predictions, bounds, true) {
                Ok(frame) => return Ok(frame),
                Err(err) => {
                    if !self.text_disabled.swap(true, Ordering::Relaxed) {
                        tracing::warn!(
                            error = %err,
                            "text rendering failed, frames will be drawn without labels"
                        );
                    }
                }
            }
        }
        self.draw(epoch, dataset, predictions, bounds, false)
    }

    fn draw(
        &self,
        epoch: u64,
        dataset: &Dataset,
        predictions: &[f32],
        bounds: &PlotBounds,
        with_text: bool,
    ) -> Result<RgbImage> {
        let render_error = |e: Box<dyn std::error::Error + Send + Sync>| FxVideoError::Render {
            epoch,
            source: e,
        };

        let mut buffer = vec![0u8; frame_buffer_len(self.width, self.height)?];
        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(|e| render_error(Box::new(e)))?;

            let mut builder = ChartBuilder::on(&root);
            builder.margin(10);
            if with_text {
                builder
                    .caption(
                        format!("Epoch = {}", epoch),
                        ("sans-serif", 14).into_font().color(&TITLE_COLOR),
                    )
                    .x_label_area_size(30)
                    .y_label_area_size(50);
            }
            let mut chart = builder
                .build_cartesian_2d(bounds.x_min..bounds.x_max, bounds.y_min..bounds.y_max)
                .map_err(|e| render_error(Box::new(e)))?;

            if with_text {
                chart
                    .configure_mesh()
                    .disable_mesh()
                    .draw()
                    .map_err(|e| render_error(Box::new(e)))?;
            }

            chart
                .draw_series(
                    dataset
                        .points()
                        .filter(|&(x, y)| bounds.contains(x, y))
                        .map(|point| Circle::new(point, POINT_SIZE, TRUTH_COLOR.filled())),
                )
                .map_err(|e| render_error(Box::new(e)))?;

            chart
                .draw_series(
                    dataset
                        .xs()
                        .iter()
                        .zip(predictions)
                        .map(|(&x, &y)| (x, f64::from(y)))
                        .filter(|&(x, y)| bounds.contains(x, y))
                        .map(|point| Circle::new(point, POINT_SIZE, PREDICTION_COLOR.filled())),
                )
                .map_err(|e| render_error(Box::new(e)))?;

            root.present().map_err(|e| render_error(Box::new(e)))?;
        }

        RgbImage::from_raw(self.width, self.height, buffer)
            .ok_or_else(|| render_error("frame buffer size mismatch".into()))
    }
}

/// RGB buffer length for a frame; frames past the GIF limit are rejected.
pub fn frame_buffer_len(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 || width > MAX_FRAME_SIDE || height > MAX_FRAME_SIDE {
        return Err(FxVideoError::validation(
            "frame size",
            format!(
                "{}x{} px is outside 1..={} px per side",
                width, height, MAX_FRAME_SIDE
            ),
        ));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or_else(|| {
            FxVideoError::validation("frame size", format!("{}x{} px overflows", width, height))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn dataset() -> Dataset {
        Dataset::from_points((0..50).map(|i| {
            let x = i as f64 / 10.0;
            (x, x.sin())
        }))
    }

    fn count_pixels(frame: &RgbImage, color: [u8; 3]) -> usize {
        frame.pixels().filter(|p| **p == Rgb(color)).count()
    }

    #[test]
    fn test_frame_has_requested_size() -> Result<()> {
        let renderer = FrameRenderer::new(320, 200);
        let dataset = dataset();
        let predictions = vec![0.0f32; dataset.len()];

        let frame = renderer.render(3, &dataset, &predictions, &dataset.bounds())?;
        assert_eq!(frame.dimensions(), (320, 200));
        Ok(())
    }

    #[test]
    fn test_draws_truth_and_predictions() -> Result<()> {
        let renderer = FrameRenderer::new(320, 200);
        let dataset = dataset();
        let predictions: Vec<f32> = dataset.ys().iter().map(|&y| (y * 0.5) as f32).collect();

        let frame = renderer.render(1, &dataset, &predictions, &dataset.bounds())?;
        assert!(count_pixels(&frame, [0, 0, 255]) > 0);
        assert!(count_pixels(&frame, [255, 0, 0]) > 0);
        Ok(())
    }

    #[test]
    fn test_points_outside_bounds_are_clipped() -> Result<()> {
        let renderer = FrameRenderer::new(200, 120);
        let dataset = dataset();
        let predictions = vec![1.0e6f32; dataset.len()];

        let frame = renderer.render(2, &dataset, &predictions, &dataset.bounds())?;
        assert_eq!(count_pixels(&frame, [255, 0, 0]), 0);
        Ok(())
    }

    #[test]
    fn test_out_of_range_truth_points_are_skipped() -> Result<()> {
        let renderer = FrameRenderer::new(200, 120);
        let dataset = dataset();
        let bounds = PlotBounds {
            x_min: 100.0,
            x_max: 200.0,
            y_min: -1.0,
            y_max: 1.0,
        };
        let predictions = vec![0.0f32; dataset.len()];

        let frame = renderer.render(2, &dataset, &predictions, &bounds)?;
        assert_eq!(count_pixels(&frame, [0, 0, 255]), 0);
        assert_eq!(count_pixels(&frame, [255, 0, 0]), 0);
        Ok(())
    }

    #[test]
    fn test_non_finite_predictions_are_skipped() -> Result<()> {
        let renderer = FrameRenderer::new(200, 120);
        let dataset = dataset();
        let predictions: Vec<f32> = (0..dataset.len())
            .map(|i| if i % 2 == 0 { f32::NAN } else { f32::INFINITY })
            .collect();

        let frame = renderer.render(4, &dataset, &predictions, &dataset.bounds())?;
        assert_eq!(count_pixels(&frame, [255, 0, 0]), 0);
        assert!(count_pixels(&frame, [0, 0, 255]) > 0);
        Ok(())
    }

    #[test]
    fn test_oversized_frames_are_rejected() {
        assert_eq!(frame_buffer_len(900, 600).unwrap(), 900 * 600 * 3);
        assert!(matches!(
            frame_buffer_len(70_000, 70_000),
            Err(FxVideoError::Validation { .. })
        ));
        assert!(frame_buffer_len(0, 10).is_err());

        let renderer = FrameRenderer::new(70_000, 600);
        let dataset = dataset();
        let predictions = vec![0.0f32; dataset.len()];
        assert!(matches!(
            renderer.render(0, &dataset, &predictions, &dataset.bounds()),
            Err(FxVideoError::Validation { .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_predictions() {
        let renderer = FrameRenderer::new(100, 100);
        let dataset = dataset();
        let result = renderer.render(0, &dataset, &[0.0, 1.0], &dataset.bounds());
        assert!(matches!(result, Err(FxVideoError::Validation { .. })));
    }
}
