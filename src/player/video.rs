use crossbeam_channel::Receiver;
use std::collections::VecDeque;

use super::decoder::DecodedVideoFrame;

/// Frames this far behind the clock are dropped
const DROP_THRESHOLD_MS: u64 = 20;
/// Frames up to this far ahead of the clock are shown early
const HOLD_THRESHOLD_MS: u64 = 20;
/// After a seek, keyframe snapping may land this far before the target
const SEEK_TOLERANCE_MS: u64 = 500;

/// Buffers decoded frames and picks the one due at the current clock time.
pub struct VideoFrameQueue {
    receiver: Receiver<DecodedVideoFrame>,
    buffer: VecDeque<DecodedVideoFrame>,
    max_buffered: usize,
}

impl VideoFrameQueue {
    pub fn new(receiver: Receiver<DecodedVideoFrame>, max_buffered: usize) -> Self {
        Self {
            receiver,
            buffer: VecDeque::with_capacity(max_buffered),
            max_buffered,
        }
    }

    fn receive_frames(&mut self) {
        while self.buffer.len() < self.max_buffered {
            match self.receiver.try_recv() {
                Ok(frame) => self.buffer.push_back(frame),
                Err(_) => break,
            }
        }
    }

    /// Next frame to present at `clock_ms`, if a new one is due.
    pub fn take_due_frame(&mut self, clock_ms: u64) -> Option<DecodedVideoFrame> {
        self.receive_frames();

        while self
            .buffer
            .front()
            .is_some_and(|f| f.pts_ms + DROP_THRESHOLD_MS < clock_ms)
        {
            self.buffer.pop_front();
        }

        if self
            .buffer
            .front()
            .is_some_and(|f| f.pts_ms <= clock_ms + HOLD_THRESHOLD_MS)
        {
            return self.buffer.pop_front();
        }
        None
    }

    /// First usable frame once a seek to `target_ms` has been issued.
    pub fn take_seek_frame(&mut self, target_ms: u64) -> Option<DecodedVideoFrame> {
        self.receive_frames();

        while self
            .buffer
            .front()
            .is_some_and(|f| f.pts_ms + SEEK_TOLERANCE_MS < target_ms)
        {
            self.buffer.pop_front();
        }
        self.buffer.pop_front()
    }

    /// Drop everything buffered or in flight.
    pub fn clear(&mut self) {
        self.buffer.clear();
        while self.receiver.try_recv().is_ok() {}
    }

    /// No frames buffered and none waiting in the channel.
    pub fn is_drained(&self) -> bool {
        self.buffer.is_empty() && self.receiver.is_empty()
    }
}
