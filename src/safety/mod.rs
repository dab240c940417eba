pub mod gate;
pub mod state;

pub use gate::{SafetyConfig, SafetyGate, SafetyVerdict};
pub use state::{SafetyState, SharedSafetyState};
