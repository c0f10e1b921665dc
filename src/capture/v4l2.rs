//! V4L2 capture device backing for device-index sources

use tracing::{debug, info};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::capture::decode;
use crate::capture::frame::{Frame, PixelFormat};
use crate::capture::source::VideoSource;
use crate::error::SourceError;

const BUFFER_COUNT: u32 = 4;

/// V4L2 capture with memory-mapped streaming
pub struct V4l2Source {
    _device: Box<Device>, // keeps the handle open for the stream's lifetime
    stream: Option<MmapStream<'static>>,
    width: u32,
    height: u32,
    format: PixelFormat,
    sequence: u64,
}

impl V4l2Source {
    /// Open device `index` and start streaming.
    pub fn open(index: u32) -> Result<Self, SourceError> {
        let device = Device::new(index as usize)
            .map_err(|e| SourceError::Unavailable(format!("device {index}: {e}")))?;

        let caps = device
            .query_caps()
            .map_err(|e| SourceError::Unavailable(format!("device {index}: {e}")))?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(SourceError::Unavailable(format!(
                "device {index} does not support video capture"
            )));
        }

        let mut fmt = device
            .format()
            .map_err(|e| SourceError::Unavailable(format!("query format: {e}")))?;
        let format = match &fmt.fourcc.repr {
            b"MJPG" => PixelFormat::Mjpeg,
            b"YUYV" => PixelFormat::Yuyv4,
            b"RGB3" => PixelFormat::Rgb24,
            _ => {
                // negotiated format is something we cannot decode, ask for MJPEG
                fmt.fourcc = FourCC::new(b"MJPG");
                fmt = device
                    .set_format(&fmt)
                    .map_err(|e| SourceError::Unavailable(format!("set format: {e}")))?;
                if fmt.fourcc != FourCC::new(b"MJPG") {
                    return Err(SourceError::Unavailable(format!(
                        "device {index} offers no supported pixel format"
                    )));
                }
                PixelFormat::Mjpeg
            }
        };

        let device = Box::new(device);
        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| SourceError::Unavailable(format!("start stream: {e}")))?;
        info!(
            "Capture stream started: {}x{} {:?}, {} buffers",
            fmt.width, fmt.height, format, BUFFER_COUNT
        );

        Ok(Self {
            _device: device,
            stream: Some(stream),
            width: fmt.width,
            height: fmt.height,
            format,
            sequence: 0,
        })
    }
}

impl VideoSource for V4l2Source {
    fn read_frame(&mut self) -> Result<Frame, SourceError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| SourceError::Read("stream not started".into()))?;

        let (buf, _meta) = stream
            .next()
            .map_err(|e| SourceError::Read(format!("dequeue: {e}")))?;

        let decoded = decode::to_rgb(buf, self.width, self.height, self.format)?;
        self.sequence += 1;

        Ok(Frame::rgb(
            self.sequence,
            decoded.width,
            decoded.height,
            decoded.data,
        ))
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        // STREAMOFF happens when the stream drops, before the device handle closes
        self.stream.take();
        debug!("V4L2 source released");
    }
}
