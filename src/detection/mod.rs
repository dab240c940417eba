pub mod config;
pub mod scoring;

pub use config::DetectorConfig;
pub use scoring::{activity_score, select_active};
