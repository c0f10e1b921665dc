//! Pipeline driver: ferries frames from the capture stage to the display
//! stage and owns the shutdown decision.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::capture::SourceFeedHandle;
use crate::display::DisplaySinkHandle;
use crate::pipeline::cell::{FrameCell, StopFlag};
use crate::pipeline::resize::resize;

/// Per-iteration yield so the ferry loop does not spin.
const TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    ShuttingDown,
    Terminated,
}

/// The only component that reads the capture cell and writes the display
/// cell, and the only one that turns one stage's stop into the other's.
pub struct Driver {
    source_frames: Arc<FrameCell>,
    source_stopped: Arc<StopFlag>,
    sink_frames: Arc<FrameCell>,
    sink_stopped: Arc<StopFlag>,
    target_width: u32,
    state: DriverState,
}

impl Driver {
    pub fn connect(feed: &SourceFeedHandle, sink: &DisplaySinkHandle, target_width: u32) -> Self {
        Self::new(
            Arc::clone(feed.cell()),
            Arc::clone(feed.stop_flag()),
            Arc::clone(sink.cell()),
            Arc::clone(sink.stop_flag()),
            target_width,
        )
    }

    pub fn new(
        source_frames: Arc<FrameCell>,
        source_stopped: Arc<StopFlag>,
        sink_frames: Arc<FrameCell>,
        sink_stopped: Arc<StopFlag>,
        target_width: u32,
    ) -> Self {
        Self {
            source_frames,
            source_stopped,
            sink_frames,
            sink_stopped,
            target_width,
            state: DriverState::Running,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run until either stage stops, then wind both down and terminate.
    /// Never blocks on I/O; the per-iteration sleep is its only wait.
    pub async fn run(&mut self) {
        info!("pipeline driver running");
        loop {
            match self.state {
                DriverState::Running => {
                    if self.source_stopped.is_stopped() || self.sink_stopped.is_stopped() {
                        self.state = DriverState::ShuttingDown;
                        continue;
                    }
                    self.ferry();
                    tokio::time::sleep(TICK).await;
                }
                DriverState::ShuttingDown => {
                    info!("stopping pipeline stages");
                    // both calls are idempotent, order does not matter
                    self.sink_stopped.stop();
                    self.source_stopped.stop();
                    self.state = DriverState::Terminated;
                }
                DriverState::Terminated => break,
            }
        }
        info!("pipeline driver terminated");
    }

    /// One handoff: latest captured frame, resized, into the display cell.
    /// A missing or malformed frame skips this iteration; the next one will
    /// see fresher data.
    fn ferry(&self) {
        let Some(frame) = self.source_frames.latest() else {
            return;
        };
        match resize(&frame, self.target_width) {
            Ok(scaled) => self.sink_frames.publish(scaled),
            Err(e) => debug!("skipping frame {}: {e}", frame.meta.sequence),
        }
    }
}
