//! Error taxonomy for the pipeline

use thiserror::Error;

use crate::capture::frame::PixelFormat;

/// Failures surfaced by a video source. The driver never sees these directly:
/// the capture stage folds any of them into its stopped flag.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source identifier could not be opened. Terminal for the run.
    #[error("video source unavailable: {0}")]
    Unavailable(String),

    /// A frame read failed after the source was opened.
    #[error("frame read failed: {0}")]
    Read(String),

    /// The source delivered its last frame.
    #[error("end of stream")]
    EndOfStream,
}

/// Failures of the per-frame resize transform. Treated as transient by the
/// driver: the write for that iteration is skipped.
#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("target width must be non-zero")]
    ZeroTargetWidth,

    #[error("malformed frame: {width}x{height} with {len} bytes")]
    Malformed { width: u32, height: u32, len: usize },

    #[error("unsupported pixel format {0:?}")]
    UnsupportedFormat(PixelFormat),
}
