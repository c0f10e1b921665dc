//! Aspect-preserving frame resize

use std::sync::Arc;

use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::capture::frame::{Frame, FrameMetadata, PixelFormat};
use crate::error::ResizeError;

/// Scale `frame` to `target_width`, keeping its aspect ratio. Pure: the input
/// frame is untouched and the transform has no side effects.
pub fn resize(frame: &Frame, target_width: u32) -> Result<Frame, ResizeError> {
    if target_width == 0 {
        return Err(ResizeError::ZeroTargetWidth);
    }
    if frame.meta.format != PixelFormat::Rgb24 {
        return Err(ResizeError::UnsupportedFormat(frame.meta.format));
    }

    let (width, height) = (frame.meta.width, frame.meta.height);
    if frame.is_malformed() {
        return Err(ResizeError::Malformed {
            width,
            height,
            len: frame.data.len(),
        });
    }

    if width == target_width {
        return Ok(frame.clone());
    }

    let image = RgbImage::from_raw(width, height, frame.data.to_vec()).ok_or(
        ResizeError::Malformed {
            width,
            height,
            len: frame.data.len(),
        },
    )?;

    // rounded, never zero
    let target_height = ((u64::from(height) * u64::from(target_width) + u64::from(width) / 2)
        / u64::from(width))
    .max(1) as u32;

    let scaled = imageops::resize(&image, target_width, target_height, FilterType::Triangle);

    Ok(Frame {
        data: Bytes::from(scaled.into_raw()),
        meta: Arc::new(FrameMetadata {
            sequence: frame.meta.sequence,
            width: target_width,
            height: target_height,
            format: PixelFormat::Rgb24,
        }),
        timestamp: frame.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> Frame {
        Frame::blank(width, height)
    }

    #[test]
    fn output_width_matches_target() {
        let scaled = resize(&frame(640, 480), 320).expect("valid resize");
        assert_eq!(scaled.width(), 320);
        assert_eq!(scaled.height(), 240);
        assert_eq!(scaled.data.len(), 320 * 240 * 3);
    }

    #[test]
    fn aspect_ratio_survives_within_rounding() {
        let scaled = resize(&frame(1920, 1080), 1080).expect("valid resize");
        assert_eq!(scaled.width(), 1080);
        // 1080 * 1080 / 1920 = 607.5, rounds to 608
        assert_eq!(scaled.height(), 608);
    }

    #[test]
    fn upscaling_works_too() {
        let scaled = resize(&frame(100, 50), 400).expect("valid resize");
        assert_eq!(scaled.width(), 400);
        assert_eq!(scaled.height(), 200);
    }

    #[test]
    fn same_width_is_a_noop() {
        let original = frame(320, 240);
        let scaled = resize(&original, 320).expect("valid resize");
        assert_eq!(scaled.data, original.data);
        assert_eq!(scaled.meta.sequence, original.meta.sequence);
    }

    #[test]
    fn height_never_collapses_to_zero() {
        let scaled = resize(&frame(1000, 1), 10).expect("valid resize");
        assert_eq!(scaled.height(), 1);
    }

    #[test]
    fn zero_target_width_is_rejected() {
        assert!(matches!(
            resize(&frame(320, 240), 0),
            Err(ResizeError::ZeroTargetWidth)
        ));
    }

    #[test]
    fn malformed_frame_is_rejected() {
        let bad = Frame::rgb(1, 320, 240, bytes::Bytes::from(vec![0u8; 10]));
        assert!(matches!(
            resize(&bad, 160),
            Err(ResizeError::Malformed { .. })
        ));
    }
}
