use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

struct ClockState {
    position_us: AtomicU64,
    paused: AtomicBool,
    /// Set on seek so the audio source drops stale samples
    flush: AtomicBool,
}

/// Playback clock driven by the audio output.
///
/// The rodio source advances it as samples are consumed; video frames are
/// presented against it. Clones share the same position.
#[derive(Clone)]
pub struct AudioClock {
    state: Arc<ClockState>,
    sample_rate: u32,
    channels: u16,
}

impl AudioClock {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            state: Arc::new(ClockState {
                position_us: AtomicU64::new(0),
                paused: AtomicBool::new(true),
                flush: AtomicBool::new(false),
            }),
            sample_rate,
            channels,
        }
    }

    pub fn position_ms(&self) -> u64 {
        self.state.position_us.load(Ordering::Relaxed) / 1000
    }

    /// Jump to `ms` and ask the audio source to discard buffered samples.
    pub fn set_position_ms(&self, ms: u64) {
        self.state.position_us.store(ms * 1000, Ordering::Relaxed);
        self.state.flush.store(true, Ordering::Relaxed);
    }

    /// Returns true once per seek.
    pub fn take_flush_request(&self) -> bool {
        self.state.flush.swap(false, Ordering::Relaxed)
    }

    /// Advance by a number of interleaved samples played.
    pub fn advance_samples(&self, samples: u64) {
        if self.state.paused.load(Ordering::Relaxed) {
            return;
        }
        let per_second = u64::from(self.sample_rate) * u64::from(self.channels);
        if per_second == 0 {
            return;
        }
        let delta_us = samples * 1_000_000 / per_second;
        self.state.position_us.fetch_add(delta_us, Ordering::Relaxed);
    }

    /// Advance by wall time, for sessions without an audio device.
    pub fn advance_us(&self, us: u64) {
        if !self.state.paused.load(Ordering::Relaxed) {
            self.state.position_us.fetch_add(us, Ordering::Relaxed);
        }
    }

    pub fn pause(&self) {
        self.state.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.state.paused.store(false, Ordering::Relaxed);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Drives an [`AudioClock`] from wall time when no audio output pulls
/// samples. Call [`tick`](Self::tick) every UI frame while playing and
/// [`reset`](Self::reset) whenever playback halts or seeks.
#[derive(Default)]
pub struct WallClockDriver {
    last_tick: Option<Instant>,
}

impl WallClockDriver {
    pub fn tick(&mut self, clock: &AudioClock, now: Instant) {
        if let Some(last) = self.last_tick {
            let elapsed = now.saturating_duration_since(last);
            clock.advance_us(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX));
        }
        self.last_tick = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_tick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn paused_clock_does_not_advance() {
        let clock = AudioClock::new(48_000, 2);
        clock.advance_samples(96_000);
        assert_eq!(clock.position_ms(), 0);
    }

    #[test]
    fn advances_by_consumed_samples() {
        let clock = AudioClock::new(48_000, 2);
        clock.resume();
        // one second of stereo audio
        clock.advance_samples(96_000);
        assert_eq!(clock.position_ms(), 1_000);
    }

    #[test]
    fn wall_clock_driver_advances_running_clock() {
        let clock = AudioClock::new(48_000, 2);
        clock.resume();
        let mut driver = WallClockDriver::default();
        let start = Instant::now();
        driver.tick(&clock, start);
        assert_eq!(clock.position_ms(), 0);
        driver.tick(&clock, start + Duration::from_millis(250));
        driver.tick(&clock, start + Duration::from_millis(400));
        assert_eq!(clock.position_ms(), 400);
    }

    #[test]
    fn wall_clock_driver_skips_halted_time() {
        let clock = AudioClock::new(48_000, 2);
        let mut driver = WallClockDriver::default();
        let start = Instant::now();

        // Paused clock ignores elapsed time
        driver.tick(&clock, start);
        driver.tick(&clock, start + Duration::from_millis(100));
        assert_eq!(clock.position_ms(), 0);

        clock.resume();
        driver.reset();
        driver.tick(&clock, start + Duration::from_secs(5));
        driver.tick(&clock, start + Duration::from_millis(5_040));
        assert_eq!(clock.position_ms(), 40);
    }

    #[test]
    fn seek_requests_a_single_flush() {
        let clock = AudioClock::new(44_100, 2);
        let shared = clock.clone();
        clock.set_position_ms(2_500);
        assert_eq!(shared.position_ms(), 2_500);
        assert!(shared.take_flush_request());
        assert!(!shared.take_flush_request());
    }
}
