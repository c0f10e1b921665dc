use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Frame data with zero-copy semantics
#[derive(Clone)]
pub struct Frame {
    /// Immutable pixel data - can be shared across threads without copying
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

/// Frame metadata
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Yuyv4,
    Mjpeg,
}

impl Frame {
    /// RGB24 frame from decoded pixel data.
    pub fn rgb(sequence: u64, width: u32, height: u32, data: Bytes) -> Self {
        Self {
            data,
            meta: Arc::new(FrameMetadata {
                sequence,
                width,
                height,
                format: PixelFormat::Rgb24,
            }),
            timestamp: Instant::now(),
        }
    }

    /// Black RGB24 frame, used to seed the display when no capture frame is
    /// available yet.
    pub fn blank(width: u32, height: u32) -> Self {
        let data = Bytes::from(vec![0u8; (width * height * 3) as usize]);
        Self::rgb(0, width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    /// A frame the resize transform and the renderer cannot use: zero
    /// dimensions, or RGB24 data that does not match its declared shape.
    pub fn is_malformed(&self) -> bool {
        if self.meta.width == 0 || self.meta.height == 0 {
            return true;
        }
        self.meta.format == PixelFormat::Rgb24
            && self.data.len() != (self.meta.width * self.meta.height * 3) as usize
    }
}
