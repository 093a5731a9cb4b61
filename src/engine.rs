//! Contract between the playback controller and the media engine doing the
//! actual decoding, rendering and audio output.

use std::path::Path;

/// Loading status of the current media resource as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    Loading,
    Loaded,
    Buffering,
    Buffered,
    EndOfMedia,
    Invalid,
}

/// Playback state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Playing,
    Paused,
}

/// Asynchronous notification emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PositionChanged(u64),
    DurationChanged(u64),
    MediaStatusChanged(MediaStatus),
    PlaybackStateChanged(EngineState),
    /// Engine failure that does not map to a media status (decoder crash,
    /// missing audio device).
    Error(String),
}

/// Volume in the engine's native scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaledVolume {
    /// Integer percent, 0..=100
    Percent(u8),
    /// Unit float, 0.0..=1.0
    Unit(f32),
}

impl ScaledVolume {
    /// Volume as a unit float, whichever scale it was expressed in.
    pub fn as_unit(self) -> f32 {
        match self {
            ScaledVolume::Percent(p) => f32::from(p.min(100)) / 100.0,
            ScaledVolume::Unit(v) => v.clamp(0.0, 1.0),
        }
    }
}

/// Playback primitives the controller drives.
///
/// None of these report failure directly: loading happens in the background
/// and progress, errors and state changes come back through [`next_event`].
///
/// [`next_event`]: MediaEngine::next_event
pub trait MediaEngine {
    /// Start loading the resource at `path`, superseding any current one.
    fn open(&mut self, path: &Path);

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    /// Seek to an offset in milliseconds.
    fn set_position(&mut self, ms: u64);

    fn set_volume(&mut self, volume: ScaledVolume);

    /// Pop the oldest pending notification, in emission order.
    fn next_event(&mut self) -> Option<EngineEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_converts_to_unit() {
        assert_eq!(ScaledVolume::Percent(0).as_unit(), 0.0);
        assert_eq!(ScaledVolume::Percent(50).as_unit(), 0.5);
        assert_eq!(ScaledVolume::Percent(100).as_unit(), 1.0);
    }

    #[test]
    fn unit_is_clamped() {
        assert_eq!(ScaledVolume::Unit(1.5).as_unit(), 1.0);
        assert_eq!(ScaledVolume::Unit(-0.2).as_unit(), 0.0);
    }
}
