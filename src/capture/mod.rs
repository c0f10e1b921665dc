pub mod decode;
pub mod feed;
pub mod frame;
pub mod source;
pub mod v4l2;

#[cfg(feature = "gstreamer-source")]
pub mod gst;

pub use feed::{SourceFeed, SourceFeedHandle};
pub use frame::Frame;
pub use frame::PixelFormat;
pub use source::{SourceId, VideoSource};
