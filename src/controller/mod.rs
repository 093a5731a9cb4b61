//! Playback controller: turns user commands into engine calls and engine
//! notifications into the values the controls display.
//!
//! The controller never changes the playback phase on its own initiative. A
//! Play click is forwarded to the engine and the buttons only change once the
//! engine reports the new state. The one exception is end of media, which
//! stops the session immediately so the controls don't look stuck mid-file
//! while the engine catches up with its own Stopped notification.
//! Opening a file also starts the new session as Stopped, whatever the old
//! one was doing.

mod config;
mod format;
mod session;

use log::{debug, error, info, warn};
use std::path::Path;

use crate::engine::{EngineEvent, EngineState, MediaEngine, MediaStatus, ScaledVolume};

pub use config::{ControllerConfig, VolumeScale};
pub use format::{format_time, format_time_display};
pub use session::{Enablement, PlaybackSession, PlaybackState};

pub const APP_TITLE: &str = "idokeno MP4 Player";

/// Values pushed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlsView {
    pub enablement: Enablement,
    pub seek_enabled: bool,
    pub slider_max_ms: u64,
    pub slider_value_ms: u64,
    pub time_text: String,
    pub status_text: String,
    pub volume_percent: u8,
    pub title: String,
}

impl ControlsView {
    fn new(volume_percent: u8) -> Self {
        Self {
            enablement: Enablement::new(false, false, false),
            seek_enabled: false,
            slider_max_ms: 0,
            slider_value_ms: 0,
            time_text: format_time_display(0, 0),
            status_text: "Ready".to_string(),
            volume_percent,
            title: APP_TITLE.to_string(),
        }
    }
}

/// Owns the playback session and the engine for one window.
pub struct PlaybackController<E: MediaEngine> {
    engine: E,
    config: ControllerConfig,
    session: PlaybackSession,
    view: ControlsView,
    dragging: bool,
}

impl<E: MediaEngine> PlaybackController<E> {
    /// Create a controller and push the initial volume to the engine.
    pub fn new(engine: E, config: ControllerConfig) -> Self {
        let session = PlaybackSession::new(config.initial_volume);
        let view = ControlsView::new(session.volume_percent);
        let mut controller = Self {
            engine,
            config,
            session,
            view,
            dragging: false,
        };
        let volume = controller.scaled_volume(controller.session.volume_percent);
        controller.engine.set_volume(volume);
        controller
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn view(&self) -> &ControlsView {
        &self.view
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    // User commands

    /// Load a media file. An empty path means the file dialog was cancelled.
    pub fn open(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            debug!("Open cancelled");
            return;
        }

        info!("Opening {}", path.display());
        self.engine.open(path);

        // A new resource supersedes whatever the engine was playing
        self.session.has_media = true;
        self.session.state = PlaybackState::Stopped;
        self.session.position_ms = 0;
        self.dragging = false;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.view.title = format!("{APP_TITLE} - {name}");
        self.view.status_text = format!("File loaded: {name}");
        self.view.seek_enabled = true;
        self.reset_position_display();
        self.refresh_enablement();
    }

    pub fn play(&mut self) {
        if !self.session.has_media {
            debug!("Play ignored, no media loaded");
            return;
        }
        self.engine.play();
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    /// Seek to `target_ms`, clamped into the known duration.
    pub fn seek(&mut self, target_ms: i64) {
        if !self.session.has_media {
            return;
        }
        let duration = i64::try_from(self.session.duration_ms).unwrap_or(i64::MAX);
        // target_ms is within [0, duration] here, so the cast is lossless
        let target = target_ms.clamp(0, duration) as u64;
        debug!("Seek to {target} ms");
        self.view.slider_value_ms = target;
        self.engine.set_position(target);
    }

    /// The user grabbed the seek slider.
    pub fn begin_seek_drag(&mut self) {
        self.dragging = true;
    }

    /// The user let go of the seek slider.
    pub fn end_seek_drag(&mut self) {
        self.dragging = false;
    }

    /// Set the output volume in percent, clamped to 0..=100.
    pub fn set_volume(&mut self, percent: i32) {
        let percent = percent.clamp(0, 100) as u8;
        self.session.volume_percent = percent;
        self.view.volume_percent = percent;
        let volume = self.scaled_volume(percent);
        self.engine.set_volume(volume);
    }

    /// Convert a percent into the configured engine scale.
    pub fn scaled_volume(&self, percent: u8) -> ScaledVolume {
        let percent = percent.min(100);
        match self.config.volume_scale {
            VolumeScale::PercentInt => ScaledVolume::Percent(percent),
            VolumeScale::UnitFloat => ScaledVolume::Unit(f32::from(percent) / 100.0),
        }
    }

    // Engine notifications

    /// Drain every pending engine notification in emission order.
    pub fn process_engine_events(&mut self) {
        while let Some(event) = self.engine.next_event() {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::PositionChanged(ms) => self.on_position_changed(ms),
            EngineEvent::DurationChanged(ms) => self.on_duration_changed(ms),
            EngineEvent::MediaStatusChanged(status) => self.on_media_status_changed(status),
            EngineEvent::PlaybackStateChanged(state) => self.on_playback_state_changed(state),
            EngineEvent::Error(message) => self.on_engine_error(&message),
        }
    }

    pub fn on_position_changed(&mut self, ms: u64) {
        self.session.position_ms = ms;
        if !self.dragging {
            self.view.slider_value_ms = ms;
        }
        self.view.time_text = format_time_display(ms, self.session.duration_ms);
    }

    pub fn on_duration_changed(&mut self, ms: u64) {
        debug!("Duration {ms} ms");
        self.session.duration_ms = ms;
        self.view.slider_max_ms = ms;
        self.view.time_text = format_time_display(self.session.position_ms, ms);
    }

    pub fn on_media_status_changed(&mut self, status: MediaStatus) {
        debug!("Media status {status:?}");
        self.view.status_text = status_text(status).to_string();

        match status {
            MediaStatus::EndOfMedia => {
                self.session.state = PlaybackState::Stopped;
                self.reset_position_display();
                self.refresh_enablement();
            }
            MediaStatus::Invalid => warn!("Engine rejected the media"),
            _ => {}
        }
    }

    pub fn on_playback_state_changed(&mut self, state: EngineState) {
        let state = PlaybackState::from(state);
        if !self.session.has_media && state != PlaybackState::Stopped {
            warn!("Ignoring {state:?} with no media loaded");
            return;
        }

        debug!("Playback state {:?} -> {state:?}", self.session.state);
        self.session.state = state;
        self.view.status_text = match state {
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::Stopped => "Stopped",
        }
        .to_string();

        if state == PlaybackState::Stopped {
            self.reset_position_display();
        }
        self.refresh_enablement();
    }

    pub fn on_engine_error(&mut self, message: &str) {
        error!("Engine error: {message}");
        self.view.status_text = format!("Error: {message}");
    }

    fn reset_position_display(&mut self) {
        self.session.position_ms = 0;
        self.view.slider_value_ms = 0;
        self.view.time_text = format_time_display(0, self.session.duration_ms);
    }

    fn refresh_enablement(&mut self) {
        self.view.enablement = self.session.enablement();
    }
}

fn status_text(status: MediaStatus) -> &'static str {
    match status {
        MediaStatus::Loading => "Loading...",
        MediaStatus::Loaded => "Loaded",
        MediaStatus::Buffering => "Buffering...",
        MediaStatus::Buffered => "Ready",
        MediaStatus::EndOfMedia => "Playback finished",
        MediaStatus::Invalid => "Invalid media file",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Open(PathBuf),
        Play,
        Pause,
        Stop,
        SetPosition(u64),
        SetVolume(ScaledVolume),
    }

    #[derive(Default)]
    struct RecordingEngine {
        calls: Vec<Call>,
        events: VecDeque<EngineEvent>,
    }

    impl MediaEngine for RecordingEngine {
        fn open(&mut self, path: &Path) {
            self.calls.push(Call::Open(path.to_path_buf()));
        }
        fn play(&mut self) {
            self.calls.push(Call::Play);
        }
        fn pause(&mut self) {
            self.calls.push(Call::Pause);
        }
        fn stop(&mut self) {
            self.calls.push(Call::Stop);
        }
        fn set_position(&mut self, ms: u64) {
            self.calls.push(Call::SetPosition(ms));
        }
        fn set_volume(&mut self, volume: ScaledVolume) {
            self.calls.push(Call::SetVolume(volume));
        }
        fn next_event(&mut self) -> Option<EngineEvent> {
            self.events.pop_front()
        }
    }

    fn controller() -> PlaybackController<RecordingEngine> {
        let mut c = PlaybackController::new(RecordingEngine::default(), ControllerConfig::default());
        c.engine_mut().calls.clear();
        c
    }

    fn loaded(duration_ms: u64) -> PlaybackController<RecordingEngine> {
        let mut c = controller();
        c.open("movie.mp4");
        c.on_duration_changed(duration_ms);
        c.on_media_status_changed(MediaStatus::Loaded);
        c.engine_mut().calls.clear();
        c
    }

    #[test]
    fn initial_volume_is_forwarded() {
        let c = PlaybackController::new(RecordingEngine::default(), ControllerConfig::default());
        assert_eq!(c.engine().calls, vec![Call::SetVolume(ScaledVolume::Unit(0.5))]);
        assert_eq!(c.view().time_text, "00:00 / 00:00");
        assert_eq!(c.view().status_text, "Ready");
        assert_eq!(c.view().title, APP_TITLE);
    }

    #[test]
    fn open_sets_media_and_title() {
        let mut c = controller();
        c.open("/videos/clip.mkv");
        assert!(c.session().has_media());
        assert_eq!(c.session().state(), PlaybackState::Stopped);
        assert_eq!(c.view().enablement, Enablement::new(true, false, false));
        assert!(c.view().seek_enabled);
        assert_eq!(c.view().title, "idokeno MP4 Player - clip.mkv");
        assert_eq!(c.view().status_text, "File loaded: clip.mkv");
        assert_eq!(c.engine().calls, vec![Call::Open(PathBuf::from("/videos/clip.mkv"))]);
    }

    #[test]
    fn reopening_while_playing_starts_stopped() {
        let mut c = loaded(40_000);
        c.on_playback_state_changed(EngineState::Playing);
        assert_eq!(c.view().enablement, Enablement::new(false, true, true));

        c.open("next.mp4");
        assert_eq!(c.session().state(), PlaybackState::Stopped);
        assert_eq!(c.view().enablement, Enablement::new(true, false, false));
    }

    #[test]
    fn empty_open_is_ignored() {
        let mut c = controller();
        c.open("");
        assert!(!c.session().has_media());
        assert!(c.engine().calls.is_empty());
        assert_eq!(c.view().status_text, "Ready");
    }

    #[test]
    fn play_without_media_is_a_no_op() {
        let mut c = controller();
        c.play();
        assert!(c.engine().calls.is_empty());
        assert_eq!(c.session().state(), PlaybackState::Stopped);
    }

    #[test]
    fn pause_and_stop_always_forward() {
        let mut c = controller();
        c.pause();
        c.stop();
        assert_eq!(c.engine().calls, vec![Call::Pause, Call::Stop]);
    }

    #[test]
    fn play_waits_for_engine() {
        let mut c = loaded(10_000);
        c.play();
        assert_eq!(c.engine().calls, vec![Call::Play]);
        assert_eq!(c.session().state(), PlaybackState::Stopped);

        c.on_playback_state_changed(EngineState::Playing);
        assert_eq!(c.session().state(), PlaybackState::Playing);
        assert_eq!(c.view().enablement, Enablement::new(false, true, true));
        assert_eq!(c.view().status_text, "Playing");
    }

    #[test]
    fn seek_clamps_into_duration() {
        let mut c = loaded(5_000);
        c.seek(-20);
        c.seek(2_500);
        c.seek(9_000);
        assert_eq!(
            c.engine().calls,
            vec![Call::SetPosition(0), Call::SetPosition(2_500), Call::SetPosition(5_000)]
        );
    }

    #[test]
    fn seek_without_media_is_ignored() {
        let mut c = controller();
        c.seek(1_000);
        assert!(c.engine().calls.is_empty());
    }

    #[test]
    fn volume_is_clamped_and_scaled() {
        let mut c = controller();
        c.set_volume(150);
        c.set_volume(-3);
        c.set_volume(25);
        assert_eq!(
            c.engine().calls,
            vec![
                Call::SetVolume(ScaledVolume::Unit(1.0)),
                Call::SetVolume(ScaledVolume::Unit(0.0)),
                Call::SetVolume(ScaledVolume::Unit(0.25)),
            ]
        );
        assert_eq!(c.session().volume_percent(), 25);
    }

    #[test]
    fn percent_scale_forwards_integers() {
        let config = ControllerConfig::default().with_volume_scale(VolumeScale::PercentInt);
        let mut c = PlaybackController::new(RecordingEngine::default(), config);
        c.set_volume(101);
        assert_eq!(
            c.engine().calls,
            vec![
                Call::SetVolume(ScaledVolume::Percent(50)),
                Call::SetVolume(ScaledVolume::Percent(100)),
            ]
        );
    }

    #[test]
    fn drag_freezes_slider_but_not_label() {
        let mut c = loaded(120_000);
        c.on_position_changed(10_000);
        c.begin_seek_drag();
        c.seek(60_000);
        c.on_position_changed(11_000);
        assert_eq!(c.view().slider_value_ms, 60_000);
        assert_eq!(c.session().position_ms(), 11_000);
        assert_eq!(c.view().time_text, "00:11 / 02:00");

        c.end_seek_drag();
        c.on_position_changed(60_040);
        assert_eq!(c.view().slider_value_ms, 60_040);
    }

    #[test]
    fn end_of_media_stops_early() {
        let mut c = loaded(30_000);
        c.on_playback_state_changed(EngineState::Playing);
        c.on_position_changed(29_900);

        c.on_media_status_changed(MediaStatus::EndOfMedia);
        assert_eq!(c.session().state(), PlaybackState::Stopped);
        assert_eq!(c.session().position_ms(), 0);
        assert_eq!(c.view().time_text, "00:00 / 00:30");
        assert_eq!(c.view().enablement, Enablement::new(true, false, false));
        assert_eq!(c.view().status_text, "Playback finished");
    }

    #[test]
    fn invalid_media_keeps_state() {
        let mut c = loaded(30_000);
        c.on_playback_state_changed(EngineState::Paused);
        let before = c.session().clone();
        c.on_media_status_changed(MediaStatus::Invalid);
        assert_eq!(c.session(), &before);
        assert_eq!(c.view().status_text, "Invalid media file");
    }

    #[test]
    fn playing_without_media_is_ignored() {
        let mut c = controller();
        c.on_playback_state_changed(EngineState::Playing);
        assert_eq!(c.session().state(), PlaybackState::Stopped);
        assert_eq!(c.view().enablement, Enablement::new(false, false, false));
    }

    #[test]
    fn duration_shorter_than_position_is_tolerated() {
        let mut c = loaded(30_000);
        c.on_position_changed(20_000);
        c.on_duration_changed(10_000);
        assert_eq!(c.session().position_ms(), 20_000);
        assert_eq!(c.session().duration_ms(), 10_000);
    }

    #[test]
    fn events_are_processed_in_order() {
        let mut c = loaded(0);
        c.engine_mut().events.extend([
            EngineEvent::DurationChanged(90_000),
            EngineEvent::PlaybackStateChanged(EngineState::Playing),
            EngineEvent::PositionChanged(1_000),
            EngineEvent::PlaybackStateChanged(EngineState::Paused),
        ]);
        c.process_engine_events();
        assert_eq!(c.session().state(), PlaybackState::Paused);
        assert_eq!(c.view().time_text, "00:01 / 01:30");
        assert_eq!(c.view().enablement, Enablement::new(true, false, true));
    }

    #[test]
    fn engine_error_is_a_status_message() {
        let mut c = loaded(1_000);
        c.handle_event(EngineEvent::Error("decoder died".into()));
        assert_eq!(c.view().status_text, "Error: decoder died");
        assert!(c.session().has_media());
    }
}
