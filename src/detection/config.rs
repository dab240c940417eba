/// Tunable weights and thresholds for active-item selection.
///
/// Weights are expected to sum to 1.0 so that scores stay in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Fraction of the item's area inside the viewport
    pub weight_visibility: f64,
    /// Item is playing with enough media buffered
    pub weight_playing: f64,
    /// Closeness of the item's vertical center to the viewport's
    pub weight_centering: f64,
    /// A finite positive duration is known
    pub weight_duration: f64,

    /// Best score must reach this to be accepted; below it there is no active item
    pub acceptance_threshold: f64,

    /// Items smaller than this in either dimension are ignored (px)
    pub min_width: f64,
    pub min_height: f64,

    /// Readiness ordinal at which a playing item counts as actually playing
    pub min_ready_state: u8,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            weight_visibility: 0.45,
            weight_playing: 0.25,
            weight_centering: 0.20,
            weight_duration: 0.10,
            acceptance_threshold: 0.3,
            min_width: 50.0,
            min_height: 50.0,
            min_ready_state: 2,
        }
    }
}

impl DetectorConfig {
    pub fn with_threshold(mut self, acceptance_threshold: f64) -> Self {
        self.acceptance_threshold = acceptance_threshold;
        self
    }
}
