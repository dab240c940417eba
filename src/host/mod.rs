//! Boundary to the page environment the controller runs inside.
//!
//! The concrete observation mechanism (mutation observers, media element
//! listeners, key dispatch) lives on the other side of [`FeedHost`]; the
//! controller only sees snapshots, [`HostEvent`]s and the abstract
//! [`HostAction`]s it asks the host to perform.

pub mod simulated;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::{CandidateItem, ItemId, Viewport};
use crate::playback::{PlaybackSignal, PlaybackSnapshot};

pub use simulated::SimulatedFeed;

/// Keys a feed understands as "go to next item".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavKey {
    ArrowDown,
    PageDown,
}

/// Side-effecting operation the host executes on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum HostAction {
    /// Synthesised keypress dispatched to the feed.
    DispatchKey { key: NavKey },
    /// Scroll the feed's scroll container by `dy` pixels.
    ScrollBy { dy: f64 },
    /// Bring the item following `after` into view.
    ScrollIntoView { after: ItemId },
    /// Invoke the platform's own "next" control.
    ClickNextControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    DispatchKey,
    ScrollBy,
    ScrollIntoView,
    ClickNextControl,
}

impl HostAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            HostAction::DispatchKey { .. } => ActionKind::DispatchKey,
            HostAction::ScrollBy { .. } => ActionKind::ScrollBy,
            HostAction::ScrollIntoView { .. } => ActionKind::ScrollIntoView,
            HostAction::ClickNextControl => ActionKind::ClickNextControl,
        }
    }
}

/// Read access to the visual tree plus the ability to act on it.
pub trait FeedHost: Send + Sync {
    /// Current page location (full URL).
    fn location(&self) -> String;

    fn viewport(&self) -> Viewport;

    /// Every playable surface currently present in the visual tree.
    fn candidates(&self) -> Vec<CandidateItem>;

    fn perform(&self, action: &HostAction) -> Result<()>;
}

/// Hotkey actions, honoured only while hotkeys are enabled in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HotkeyAction {
    AdvanceNow,
    TogglePause,
}

/// Change notifications pushed by the host's passive observers.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The host saw a history change; re-check the location now rather than
    /// waiting for the next poll.
    LocationChanged,
    /// Geometry-affecting mutation of the visual tree.
    TreeChanged,
    Scrolled {
        delta_y: f64,
    },
    Playback {
        item: ItemId,
        signal: PlaybackSignal,
        snapshot: PlaybackSnapshot,
    },
    VisibilityChanged {
        visible: bool,
    },
    /// Pointer-down or touch-start on the media surface or one of its controls.
    PointerDown,
    /// A navigation key reached the page. `synthetic` is true for keys the
    /// orchestrator dispatched itself.
    NavigationKey {
        synthetic: bool,
    },
    Hotkey(HotkeyAction),
}
