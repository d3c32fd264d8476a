//! Cells shared between the acquisition, detection and actuation threads.
//!
//! Each cell is a cheap clonable handle around its own primitive. Values are
//! always replaced as a whole, so a reader sees either the old or the new
//! value, never a mix.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use image::RgbImage;

/// Longest uninterrupted nap taken by [`RunningFlag::sleep`].
const SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Process-wide run flag. Goes from running to stopped exactly once.
#[derive(Clone, Debug)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Requests every loop to exit. Returns true for the call that actually
    /// flipped the flag.
    pub fn stop(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    /// Sleeps for `duration` unless the flag is cleared in the meantime.
    /// Returns whether the flag is still set.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
        false
    }
}

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest frame from the feed. Older frames are dropped, never queued.
#[derive(Clone, Debug, Default)]
pub struct FrameSlot(Arc<Mutex<Option<(u64, Arc<RgbImage>)>>>);

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current frame and returns its sequence number.
    pub fn publish(&self, frame: RgbImage) -> u64 {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = slot.as_ref().map_or(1, |(sequence, _)| sequence + 1);
        *slot = Some((sequence, Arc::new(frame)));
        sequence
    }

    /// Current frame with its sequence number, if any frame arrived yet.
    pub fn latest(&self) -> Option<(u64, Arc<RgbImage>)> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(sequence, frame)| (*sequence, Arc::clone(frame)))
    }
}

/// Press duration of the next jump, in milliseconds. Last write wins.
#[derive(Clone, Debug)]
pub struct PendingDuration(Arc<AtomicU64>);

impl PendingDuration {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(0f64.to_bits())))
    }

    pub fn store(&self, duration_ms: f64) {
        self.0.store(duration_ms.to_bits(), Ordering::SeqCst);
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }

    /// Current value as a `Duration`; negative or non-finite values read as zero.
    pub fn as_duration(&self) -> Duration {
        let ms = self.load();
        if ms.is_finite() && ms > 0.0 {
            Duration::from_secs_f64(ms / 1000.0)
        } else {
            Duration::ZERO
        }
    }
}

impl Default for PendingDuration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_flag_stops_once() {
        let running = RunningFlag::new();
        let other = running.clone();
        assert!(running.is_running());
        assert!(other.stop());
        assert!(!other.stop());
        assert!(!running.is_running());
    }

    #[test]
    fn test_sleep_returns_early_when_stopped() {
        let running = RunningFlag::new();
        let stopper = running.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stopper.stop();
        });

        let start = Instant::now();
        assert!(!running.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }

    #[test]
    fn test_sleep_full_duration_while_running() {
        let running = RunningFlag::new();
        let start = Instant::now();
        assert!(running.sleep(Duration::from_millis(15)));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_frame_slot_keeps_latest() {
        let slot = FrameSlot::new();
        assert!(slot.latest().is_none());

        assert_eq!(slot.publish(RgbImage::new(2, 2)), 1);
        assert_eq!(slot.publish(RgbImage::new(3, 3)), 2);

        let (sequence, frame) = slot.latest().unwrap();
        assert_eq!(sequence, 2);
        assert_eq!(frame.dimensions(), (3, 3));
    }

    #[test]
    fn test_pending_duration() {
        let pending = PendingDuration::new();
        assert_eq!(pending.load(), 0.0);
        assert_eq!(pending.as_duration(), Duration::ZERO);

        pending.store(97.25);
        assert_eq!(pending.load(), 97.25);
        assert!((pending.as_duration().as_secs_f64() - 0.09725).abs() < 1e-9);

        pending.store(-5.0);
        assert_eq!(pending.as_duration(), Duration::ZERO);
    }
}
