pub mod session;

pub use session::{
    EndDetectorConfig, EndReason, PlaybackSession, PlaybackSignal, PlaybackSnapshot, SessionPhase,
};
