//! Video source capability and source identifier resolution

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capture::frame::Frame;
use crate::capture::v4l2::V4l2Source;
use crate::error::SourceError;

/// A handle to an opened video source. The capture stage owns it exclusively
/// for its lifetime; dropping it releases the underlying device or pipeline.
pub trait VideoSource: Send {
    /// Blocks until the next frame is available, decoded to RGB24.
    fn read_frame(&mut self) -> Result<Frame, SourceError>;
}

/// Resolved source identifier: a capture device index or a file/stream URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceId {
    Device(u32),
    Uri(String),
}

impl SourceId {
    /// Resolve a raw command-line value. An all-digit string is a device index
    /// unless a file of that exact name exists; anything else is a path or URL.
    pub fn resolve(raw: &str) -> Self {
        if !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && !Path::new(raw).is_file()
        {
            if let Ok(index) = raw.parse::<u32>() {
                return SourceId::Device(index);
            }
        }
        SourceId::Uri(raw.to_string())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        SourceId::Device(0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Device(index) => write!(f, "device {index}"),
            SourceId::Uri(uri) => write!(f, "{uri}"),
        }
    }
}

/// Open the source named by `id`.
pub fn open(id: &SourceId) -> Result<Box<dyn VideoSource>, SourceError> {
    match id {
        SourceId::Device(index) => Ok(Box::new(V4l2Source::open(*index)?)),
        #[cfg(feature = "gstreamer-source")]
        SourceId::Uri(uri) => Ok(Box::new(crate::capture::gst::GstSource::open(uri)?)),
        #[cfg(not(feature = "gstreamer-source"))]
        SourceId::Uri(uri) => Err(SourceError::Unavailable(format!(
            "built without gstreamer-source, cannot open {uri}"
        ))),
    }
}
