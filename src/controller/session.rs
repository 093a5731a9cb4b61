use crate::engine::EngineState;

/// Playback phase mirrored from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl From<EngineState> for PlaybackState {
    fn from(state: EngineState) -> Self {
        match state {
            EngineState::Stopped => PlaybackState::Stopped,
            EngineState::Playing => PlaybackState::Playing,
            EngineState::Paused => PlaybackState::Paused,
        }
    }
}

/// State record owned by the controller for the lifetime of the window.
///
/// Fields are only mutated through `PlaybackController`; readers get copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    pub(crate) state: PlaybackState,
    pub(crate) has_media: bool,
    pub(crate) position_ms: u64,
    /// 0 while unknown
    pub(crate) duration_ms: u64,
    pub(crate) volume_percent: u8,
}

impl PlaybackSession {
    pub fn new(volume_percent: u8) -> Self {
        Self {
            state: PlaybackState::Stopped,
            has_media: false,
            position_ms: 0,
            duration_ms: 0,
            volume_percent: volume_percent.min(100),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn has_media(&self) -> bool {
        self.has_media
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn volume_percent(&self) -> u8 {
        self.volume_percent
    }

    /// Which transport buttons are usable in the current phase.
    pub fn enablement(&self) -> Enablement {
        Enablement::for_state(self.state, self.has_media)
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(50)
    }
}

/// Enabled flags for the play, pause and stop buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enablement {
    pub play: bool,
    pub pause: bool,
    pub stop: bool,
}

impl Enablement {
    pub const fn new(play: bool, pause: bool, stop: bool) -> Self {
        Self { play, pause, stop }
    }

    pub fn for_state(state: PlaybackState, has_media: bool) -> Self {
        match (state, has_media) {
            (PlaybackState::Stopped, false) => Self::new(false, false, false),
            (PlaybackState::Stopped, true) => Self::new(true, false, false),
            (PlaybackState::Playing, _) => Self::new(false, true, true),
            (PlaybackState::Paused, _) => Self::new(true, false, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_stopped_and_empty() {
        let session = PlaybackSession::default();
        assert_eq!(session.state(), PlaybackState::Stopped);
        assert!(!session.has_media());
        assert_eq!(session.position_ms(), 0);
        assert_eq!(session.duration_ms(), 0);
        assert_eq!(session.volume_percent(), 50);
    }

    #[test]
    fn initial_volume_is_capped() {
        assert_eq!(PlaybackSession::new(180).volume_percent(), 100);
    }

    #[test]
    fn enablement_table() {
        use PlaybackState::*;
        assert_eq!(Enablement::for_state(Stopped, false), Enablement::new(false, false, false));
        assert_eq!(Enablement::for_state(Stopped, true), Enablement::new(true, false, false));
        assert_eq!(Enablement::for_state(Playing, true), Enablement::new(false, true, true));
        assert_eq!(Enablement::for_state(Paused, true), Enablement::new(true, false, true));
    }
}
