pub mod item;
pub mod stats;

pub use item::{CandidateItem, ItemId, PlaybackState, Rect, VideoInfo, Viewport};
pub use stats::SessionCounters;
