pub mod commands;
pub mod events;
pub mod runner;
pub mod state;

pub use commands::{ControlRequest, ControlResponse, StateSnapshot, TestScrollResult};
pub use events::{ChannelSink, ControllerEvent, EventSink, LogSink};
pub use runner::{Controller, ControllerConfig, ControllerHandle, HostNotifier};
pub use state::{ControllerStatus, ControllerStatusKind, TrackingContext};
