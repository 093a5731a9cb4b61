pub mod controller;
pub mod engine;
pub mod error;
pub mod player;
pub mod ui;

pub use controller::{
    format_time_display, ControlsView, ControllerConfig, Enablement, PlaybackController,
    PlaybackSession, PlaybackState, VolumeScale,
};
pub use engine::{EngineEvent, EngineState, MediaEngine, MediaStatus, ScaledVolume};
pub use error::MediaError;
pub use player::VideoPlayer;
pub use ui::controls::{ControlsResponse, PlayerControls};
