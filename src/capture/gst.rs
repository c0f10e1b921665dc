//! GStreamer-based source for file paths and network stream URLs

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use tracing::{debug, info};

use crate::capture::frame::Frame;
use crate::capture::source::VideoSource;
use crate::error::SourceError;

/// Decodes any URI GStreamer can handle into RGB frames via an appsink.
pub struct GstSource {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    sequence: u64,
}

impl GstSource {
    /// Build and start a playback pipeline for `uri` (a local path or URL).
    pub fn open(uri: &str) -> Result<Self, SourceError> {
        gst::init()
            .map_err(|e| SourceError::Unavailable(format!("gstreamer init: {e}")))?;

        let location = resolve_uri(uri)?;
        let pipeline_str = format!(
            "uridecodebin uri=\"{location}\" ! \
             videoconvert ! \
             video/x-raw,format=RGB ! \
             appsink name=appsink"
        );
        info!("Pipeline: {}", pipeline_str);

        let pipeline = gst::parse::launch(&pipeline_str)
            .map_err(|e| SourceError::Unavailable(format!("parse pipeline: {e}")))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| SourceError::Unavailable("failed to create pipeline".into()))?;

        let appsink = pipeline
            .by_name("appsink")
            .ok_or_else(|| SourceError::Unavailable("failed to find appsink element".into()))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| SourceError::Unavailable("failed to cast to AppSink".into()))?;

        appsink.set_property("emit-signals", false);
        appsink.set_property("max-buffers", 3u32);
        appsink.set_property("drop", true); // latest-wins at the decode boundary too
        appsink.set_property("sync", true); // deliver at the stream's natural rate

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| SourceError::Unavailable(format!("start pipeline: {e:?}")))?;

        // uridecodebin links pads asynchronously, so Async is a normal outcome
        let (state_change, _, _) = pipeline.state(Some(gst::ClockTime::from_seconds(5)));
        match state_change {
            Ok(gst::StateChangeSuccess::Success) | Ok(gst::StateChangeSuccess::Async) => {
                info!("Playback pipeline started");
            }
            Ok(gst::StateChangeSuccess::NoPreroll) => {
                debug!("Live source, no preroll");
            }
            Err(e) => {
                let _ = pipeline.set_state(gst::State::Null);
                return Err(SourceError::Unavailable(format!(
                    "pipeline failed to start: {e:?}"
                )));
            }
        }

        Ok(Self {
            pipeline,
            appsink,
            sequence: 0,
        })
    }
}

impl VideoSource for GstSource {
    fn read_frame(&mut self) -> Result<Frame, SourceError> {
        if self.appsink.is_eos() {
            return Err(SourceError::EndOfStream);
        }

        // blocks until the next sample is prerolled
        let sample = self.appsink.pull_sample().map_err(|_| {
            if self.appsink.is_eos() {
                SourceError::EndOfStream
            } else {
                SourceError::Read("failed to pull sample from pipeline".into())
            }
        })?;

        let buffer = sample
            .buffer()
            .ok_or_else(|| SourceError::Read("sample contains no buffer".into()))?;
        let map = buffer
            .map_readable()
            .map_err(|_| SourceError::Read("failed to map buffer".into()))?;

        let caps = sample
            .caps()
            .ok_or_else(|| SourceError::Read("sample has no caps".into()))?;
        let video_info = gst_video::VideoInfo::from_caps(caps)
            .map_err(|_| SourceError::Read("failed to parse video info from caps".into()))?;

        let width = video_info.width();
        let height = video_info.height();
        let stride = video_info.stride()[0] as usize;
        let row = width as usize * 3;

        // repack padded rows so downstream sees tightly packed RGB24
        let data = if stride == row {
            bytes::Bytes::copy_from_slice(map.as_slice())
        } else {
            let mut packed = Vec::with_capacity(row * height as usize);
            for line in map.as_slice().chunks(stride).take(height as usize) {
                packed.extend_from_slice(&line[..row]);
            }
            bytes::Bytes::from(packed)
        };

        self.sequence += 1;
        Ok(Frame::rgb(self.sequence, width, height, data))
    }
}

impl Drop for GstSource {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
        debug!("GStreamer source released");
    }
}

/// Bare paths become file:// URIs; anything with a scheme passes through.
fn resolve_uri(uri: &str) -> Result<String, SourceError> {
    if uri.contains("://") {
        return Ok(uri.to_string());
    }
    let absolute = std::fs::canonicalize(uri)
        .map_err(|e| SourceError::Unavailable(format!("{uri}: {e}")))?;
    Ok(format!("file://{}", absolute.display()))
}
