/// Scale the engine expects for volume values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolumeScale {
    /// Integer percent, 0..=100
    PercentInt,
    /// Float, 0.0..=1.0. Native scale of the rodio-backed player.
    #[default]
    UnitFloat,
}

/// Controller settings fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub volume_scale: VolumeScale,
    /// Percent, clamped to 100
    pub initial_volume: u8,
}

impl ControllerConfig {
    pub fn with_volume_scale(mut self, scale: VolumeScale) -> Self {
        self.volume_scale = scale;
        self
    }

    pub fn with_initial_volume(mut self, percent: u8) -> Self {
        self.initial_volume = percent.min(100);
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            volume_scale: VolumeScale::UnitFloat,
            initial_volume: 50,
        }
    }
}
