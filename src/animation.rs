use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, RgbImage};

use crate::errors::{FxVideoError, Result};

/// GIF delays are stored in centiseconds, so faster rates would round to zero.
pub const MAX_FPS: u32 = 100;

/// Display time of one frame at `fps`.
pub fn frame_delay(fps: u32) -> Result<Delay> {
    if !(1..=MAX_FPS).contains(&fps) {
        return Err(FxVideoError::validation(
            "fps",
            format!("must be between 1 and {}, got {}", MAX_FPS, fps),
        ));
    }
    Ok(Delay::from_numer_denom_ms(1000, fps))
}

/// Writes `frames` as an endlessly looping GIF played at `fps`.
///
/// `speed` is the quantizer speed, 1 (best quality) to 30 (fastest).
pub fn encode_gif(path: &Path, frames: Vec<RgbImage>, fps: u32, speed: i32) -> Result<()> {
    if frames.is_empty() {
        return Err(FxVideoError::validation("frames", "is empty, nothing to encode"));
    }
    let delay = frame_delay(fps)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FxVideoError::FileSystem {
            path: parent.to_path_buf(),
            operation: "output directory creation".to_string(),
            source: e,
        })?;
    }

    let file = File::create(path).map_err(|e| FxVideoError::FileSystem {
        path: path.to_path_buf(),
        operation: "output file creation".to_string(),
        source: e,
    })?;
    let encoding_error = |e: image::ImageError| FxVideoError::Encoding {
        path: path.to_path_buf(),
        source: Box::new(e),
    };

    let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), speed.clamp(1, 30));
    encoder.set_repeat(Repeat::Infinite).map_err(encoding_error)?;
    encoder
        .encode_frames(frames.into_iter().map(|frame| {
            let rgba = DynamicImage::ImageRgb8(frame).into_rgba8();
            Frame::from_parts(rgba, 0, 0, delay)
        }))
        .map_err(encoding_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, Rgb};
    use std::io::BufReader;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_encodes_all_frames() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let output = temp_dir.path().join("nested").join("video.gif");
        let frames = vec![
            RgbImage::from_pixel(40, 30, Rgb([255, 0, 0])),
            RgbImage::from_pixel(40, 30, Rgb([0, 0, 255])),
            RgbImage::from_pixel(40, 30, Rgb([255, 255, 255])),
        ];

        encode_gif(&output, frames, 20, 10)?;

        let decoder = GifDecoder::new(BufReader::new(File::open(&output)?)).unwrap();
        let decoded = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].buffer().dimensions(), (40, 30));
        assert_eq!(decoded[0].delay().numer_denom_ms(), (50, 1));

        let first = decoded[0].buffer().get_pixel(0, 0);
        assert!(first[0] > 200 && first[2] < 50);
        let second = decoded[1].buffer().get_pixel(0, 0);
        assert!(second[2] > 200 && second[0] < 50);
        Ok(())
    }

    #[test]
    fn test_frame_delay_range() {
        assert_eq!(
            Duration::from(frame_delay(10).unwrap()),
            Duration::from_millis(100)
        );
        assert_eq!(
            Duration::from(frame_delay(MAX_FPS).unwrap()),
            Duration::from_millis(10)
        );
        assert!(frame_delay(0).is_err());
        assert!(frame_delay(MAX_FPS + 1).is_err());

        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("fast.gif");
        let frames = vec![RgbImage::new(4, 4)];
        assert!(matches!(
            encode_gif(&output, frames, 240, 10),
            Err(FxVideoError::Validation { .. })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_rejects_empty_frames() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("video.gif");
        assert!(matches!(
            encode_gif(&output, Vec::new(), 10, 10),
            Err(FxVideoError::Validation { .. })
        ));
        assert!(!output.exists());
    }
}
