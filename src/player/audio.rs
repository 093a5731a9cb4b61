use parking_lot::Mutex;
use rodio::Source;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::clock::AudioClock;

/// Samples between clock updates.
const CLOCK_BATCH: u64 = 256;

/// Bounded sample queue shared between the decoder thread and the audio
/// output. Pushing never blocks; the oldest samples are dropped when full.
pub struct SampleRing {
    samples: Mutex<VecDeque<f32>>,
    capacity: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        })
    }

    pub fn push_slice(&self, items: &[f32]) {
        let mut samples = self.samples.lock();
        let overflow = (samples.len() + items.len()).saturating_sub(self.capacity);
        let dropped = overflow.min(samples.len());
        samples.drain(..dropped);
        // A single slice larger than the ring keeps only its tail
        let skip = items.len().saturating_sub(self.capacity);
        samples.extend(&items[skip..]);
    }

    pub fn pop(&self) -> Option<f32> {
        self.samples.lock().pop_front()
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

/// Endless rodio source reading decoded samples and driving the clock.
/// Plays silence on underrun.
pub struct AudioSource {
    ring: Arc<SampleRing>,
    clock: AudioClock,
    consumed: u64,
}

impl AudioSource {
    pub fn new(ring: Arc<SampleRing>, clock: AudioClock) -> Self {
        Self {
            ring,
            clock,
            consumed: 0,
        }
    }
}

impl Iterator for AudioSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.clock.take_flush_request() {
            self.ring.clear();
            self.consumed = 0;
            return Some(0.0);
        }

        // Underruns still count towards the clock, otherwise files without
        // an audio stream would never advance
        let sample = self.ring.pop().unwrap_or(0.0);
        self.consumed += 1;
        if self.consumed % CLOCK_BATCH == 0 {
            self.clock.advance_samples(CLOCK_BATCH);
        }
        Some(sample)
    }
}

impl Source for AudioSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.clock.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
