//! Shared-state plumbing between pipeline stages

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use crossbeam::utils::CachePadded;

use crate::capture::Frame;

/// Latest-wins single-slot frame holder.
///
/// One writer overwrites the slot on every publish; one reader always observes
/// some complete, previously published frame. There is no queue: a slow reader
/// skips intermediate frames instead of falling behind.
pub struct FrameCell {
    slot: ArcSwapOption<Frame>,

    /// Statistics
    stats: CachePadded<Stats>,
}

#[derive(Default)]
struct Stats {
    frames_published: AtomicUsize,
    frames_observed: AtomicUsize,
}

impl FrameCell {
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::const_empty(),
            stats: CachePadded::new(Stats::default()),
        }
    }

    /// Cell holding `frame` from the start.
    pub fn seeded(frame: Frame) -> Self {
        let cell = Self::new();
        cell.publish(frame);
        cell
    }

    /// Writer: replace whatever the slot holds with `frame`.
    pub fn publish(&self, frame: Frame) {
        self.slot.store(Some(Arc::new(frame)));
        self.stats.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Reader: the most recently published frame, if any.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        let frame = self.slot.load_full();
        if frame.is_some() {
            self.stats.frames_observed.fetch_add(1, Ordering::Relaxed);
        }
        frame
    }

    pub fn stats(&self) -> (usize, usize) {
        (
            self.stats.frames_published.load(Ordering::Relaxed),
            self.stats.frames_observed.load(Ordering::Relaxed),
        )
    }
}

impl Default for FrameCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic liveness flag: flips false -> true exactly once, never back.
#[derive(Default)]
pub struct StopFlag(AtomicBool);

impl StopFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Flag that starts in the stopped state, for stages that never ran.
    pub fn stopped() -> Self {
        Self(AtomicBool::new(true))
    }

    /// Idempotent.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::thread;

    fn frame(sequence: u64) -> Frame {
        Frame::rgb(sequence, 2, 2, Bytes::from(vec![sequence as u8; 12]))
    }

    #[test]
    fn empty_cell_yields_nothing() {
        let cell = FrameCell::new();
        assert!(cell.latest().is_none());
        assert_eq!(cell.stats(), (0, 0));
    }

    #[test]
    fn latest_wins_over_intermediate_frames() {
        let cell = FrameCell::new();
        cell.publish(frame(1));
        cell.publish(frame(2));

        let observed = cell.latest().expect("cell was published to");
        assert_eq!(observed.meta.sequence, 2);
        assert_eq!(cell.stats(), (2, 1));
    }

    #[test]
    fn seeded_cell_yields_the_seed() {
        let cell = FrameCell::seeded(frame(7));
        assert_eq!(cell.latest().expect("seeded").meta.sequence, 7);
    }

    #[test]
    fn reader_observes_complete_frames_across_threads() {
        let cell = Arc::new(FrameCell::new());
        let writer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for sequence in 1..=200 {
                    cell.publish(frame(sequence));
                }
            })
        };

        for _ in 0..200 {
            if let Some(observed) = cell.latest() {
                // every byte of a published frame carries its sequence number,
                // so a torn read would show up as mixed bytes
                let expected = vec![observed.meta.sequence as u8; 12];
                assert_eq!(observed.data.as_ref(), expected.as_slice());
            }
        }
        writer.join().expect("writer thread");
    }

    #[test]
    fn stop_flag_is_monotonic_and_idempotent() {
        let flag = StopFlag::new();
        assert!(!flag.is_stopped());

        flag.stop();
        flag.stop();
        assert!(flag.is_stopped());
        assert!(flag.is_stopped());
    }

    #[test]
    fn pre_stopped_flag_reports_stopped() {
        assert!(StopFlag::stopped().is_stopped());
    }
}
