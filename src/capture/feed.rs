//! Capture stage: pulls frames from the video source on a dedicated thread
//! and publishes the newest one into a latest-wins cell.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::capture::frame::Frame;
use crate::capture::source::VideoSource;
use crate::error::SourceError;
use crate::pipeline::cell::{FrameCell, StopFlag};

pub struct SourceFeed;

/// Live handle to a running (or already stopped) capture stage.
pub struct SourceFeedHandle {
    frames: Arc<FrameCell>,
    stopped: Arc<StopFlag>,
    worker: Option<JoinHandle<()>>,
}

impl SourceFeed {
    /// Seed the cell with one synchronous read, then run the acquisition loop
    /// on its own thread. A failed first read leaves the handle stopped with
    /// no thread spawned; the source is released before this returns.
    pub fn start(mut source: Box<dyn VideoSource>) -> SourceFeedHandle {
        let frames = Arc::new(FrameCell::new());
        let stopped = Arc::new(StopFlag::new());

        match source.read_frame() {
            Ok(frame) => frames.publish(frame),
            Err(e) => {
                warn!("initial frame read failed: {e}");
                stopped.stop();
                return SourceFeedHandle {
                    frames,
                    stopped,
                    worker: None,
                };
            }
        }

        let worker = {
            let frames = Arc::clone(&frames);
            let stopped = Arc::clone(&stopped);
            thread::Builder::new()
                .name("source-feed".into())
                .spawn(move || {
                    acquisition_loop(source.as_mut(), &frames, &stopped);
                    // source drops here: released exactly once, never mid-read
                })
        };

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("failed to spawn capture thread: {e}");
                stopped.stop();
                None
            }
        };

        SourceFeedHandle {
            frames,
            stopped,
            worker,
        }
    }

    /// Handle for a source that could not be opened at all: liveness starts
    /// stopped and the cell stays empty, so the driver shuts the run down
    /// without ever handing a frame to the display.
    pub fn unavailable() -> SourceFeedHandle {
        SourceFeedHandle {
            frames: Arc::new(FrameCell::new()),
            stopped: Arc::new(StopFlag::stopped()),
            worker: None,
        }
    }
}

fn acquisition_loop(source: &mut dyn VideoSource, frames: &FrameCell, stopped: &StopFlag) {
    info!("capture loop running");
    while !stopped.is_stopped() {
        match source.read_frame() {
            Ok(frame) => frames.publish(frame),
            Err(SourceError::EndOfStream) => {
                info!("source reached end of stream");
                stopped.stop();
            }
            Err(e) => {
                warn!("frame read failed: {e}");
                stopped.stop();
            }
        }
    }
    let (published, observed) = frames.stats();
    info!(published, observed, "capture loop exited");
}

impl SourceFeedHandle {
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.frames.latest()
    }

    pub fn cell(&self) -> &Arc<FrameCell> {
        &self.frames
    }

    pub fn stop_flag(&self) -> &Arc<StopFlag> {
        &self.stopped
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_stopped()
    }

    /// Request stop. The device itself is released by the loop thread once it
    /// observes the flag.
    pub fn stop(&self) {
        self.stopped.stop();
    }

    /// Wait for the acquisition loop to exit.
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn test_frame(sequence: u64) -> Frame {
        Frame::rgb(sequence, 2, 2, Bytes::from(vec![sequence as u8; 12]))
    }

    /// Source that plays back a fixed script of results, then ends the stream.
    struct ScriptedSource {
        script: VecDeque<Result<Frame, SourceError>>,
        releases: Arc<AtomicUsize>,
    }

    impl VideoSource for ScriptedSource {
        fn read_frame(&mut self) -> Result<Frame, SourceError> {
            self.script
                .pop_front()
                .unwrap_or(Err(SourceError::EndOfStream))
        }
    }

    impl Drop for ScriptedSource {
        fn drop(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Source that never runs dry.
    struct EndlessSource {
        sequence: u64,
    }

    impl VideoSource for EndlessSource {
        fn read_frame(&mut self) -> Result<Frame, SourceError> {
            self.sequence += 1;
            Ok(test_frame(self.sequence))
        }
    }

    fn wait_until_stopped(handle: &SourceFeedHandle) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_stopped() {
            assert!(Instant::now() < deadline, "feed did not stop in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn failed_first_read_leaves_a_stopped_empty_handle() {
        let releases = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource {
            script: VecDeque::from([Err(SourceError::Read("no signal".into()))]),
            releases: Arc::clone(&releases),
        };

        let handle = SourceFeed::start(Box::new(source));
        assert!(handle.is_stopped());
        assert!(handle.latest().is_none());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        handle.join();
    }

    #[test]
    fn latest_frame_is_always_one_the_source_produced() {
        let releases = Arc::new(AtomicUsize::new(0));
        let script = (1..=5).map(|n| Ok(test_frame(n))).collect();
        let source = ScriptedSource {
            script,
            releases: Arc::clone(&releases),
        };

        let handle = SourceFeed::start(Box::new(source));
        wait_until_stopped(&handle);

        // end of stream after frame 5, so the last published frame is frame 5,
        // byte-for-byte as the source produced it
        let last = handle.latest().expect("frames were published");
        assert_eq!(last.meta.sequence, 5);
        assert_eq!(last.data.as_ref(), vec![5u8; 12].as_slice());
        handle.join();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn read_error_flips_liveness_and_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource {
            script: VecDeque::from([
                Ok(test_frame(1)),
                Err(SourceError::Read("device unplugged".into())),
            ]),
            releases: Arc::clone(&releases),
        };

        let handle = SourceFeed::start(Box::new(source));
        wait_until_stopped(&handle);
        handle.join();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_is_idempotent_and_monotonic() {
        let source = EndlessSource { sequence: 0 };
        let handle = SourceFeed::start(Box::new(source));
        assert!(!handle.is_stopped());

        handle.stop();
        handle.stop();
        for _ in 0..10 {
            assert!(handle.is_stopped());
        }
        handle.join();
    }

    #[test]
    fn unavailable_handle_starts_stopped() {
        let handle = SourceFeed::unavailable();
        assert!(handle.is_stopped());
        assert!(handle.latest().is_none());
        handle.join();
    }
}
