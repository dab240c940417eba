use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

use crate::settings::SafetySettings;

use super::state::SafetyState;

#[derive(Debug, Clone, PartialEq)]
pub struct SafetyConfig {
    /// Automatic advance stays off this long after a manual scroll
    pub manual_scroll_cooldown: Duration,
    /// Minimum scroll distance (px) that counts as a manual scroll
    pub manual_scroll_distance: f64,
    /// Automatic advance stays off this long after pointer-down/touch-start
    pub interaction_cooldown: Duration,
    /// How long scrolls after an orchestrator action are attributed to it
    pub system_scroll_window: Duration,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            manual_scroll_cooldown: Duration::from_millis(2000),
            manual_scroll_distance: 50.0,
            interaction_cooldown: Duration::from_millis(1000),
            system_scroll_window: Duration::from_millis(1200),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SafetyVerdict {
    Allowed,
    Paused,
    TabInactive,
    ManualScroll,
    UserInteraction,
}

impl SafetyVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, SafetyVerdict::Allowed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyVerdict::Allowed => "allowed",
            SafetyVerdict::Paused => "paused",
            SafetyVerdict::TabInactive => "tab_inactive",
            SafetyVerdict::ManualScroll => "manual_scroll",
            SafetyVerdict::UserInteraction => "user_interaction",
        }
    }
}

/// Policy answering "may the feed be advanced automatically right now?".
///
/// Every check is a synchronous read of the current [`SafetyState`]; nothing
/// here waits.
#[derive(Debug, Clone, Default)]
pub struct SafetyGate {
    config: SafetyConfig,
}

impl SafetyGate {
    pub fn new(config: SafetyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub fn can_advance(
        &self,
        state: &SafetyState,
        toggles: &SafetySettings,
        paused: bool,
        now: Instant,
    ) -> SafetyVerdict {
        if paused {
            return SafetyVerdict::Paused;
        }

        if toggles.stop_on_tab_inactive && !state.foreground {
            return SafetyVerdict::TabInactive;
        }

        if toggles.stop_on_manual_scroll {
            let manual = [state.last_manual_scroll, state.last_manual_navigation]
                .into_iter()
                .flatten()
                .any(|at| within(at, now, self.config.manual_scroll_cooldown));
            if manual {
                return SafetyVerdict::ManualScroll;
            }
        }

        if toggles.pause_on_interaction {
            if let Some(at) = state.last_interaction {
                if within(at, now, self.config.interaction_cooldown) {
                    return SafetyVerdict::UserInteraction;
                }
            }
        }

        SafetyVerdict::Allowed
    }
}

fn within(at: Instant, now: Instant, window: Duration) -> bool {
    now.saturating_duration_since(at) < window
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggles(tab: bool, scroll: bool, interaction: bool) -> SafetySettings {
        SafetySettings {
            stop_on_tab_inactive: tab,
            stop_on_manual_scroll: scroll,
            pause_on_interaction: interaction,
        }
    }

    #[test]
    fn background_tab_is_denied_only_when_configured() {
        let gate = SafetyGate::default();
        let now = Instant::now();
        let mut state = SafetyState::default();
        state.set_foreground(false);

        assert_eq!(
            gate.can_advance(&state, &toggles(true, true, true), false, now),
            SafetyVerdict::TabInactive
        );
        assert_eq!(
            gate.can_advance(&state, &toggles(false, true, true), false, now),
            SafetyVerdict::Allowed
        );
    }

    #[test]
    fn pause_overrides_everything() {
        let gate = SafetyGate::default();
        let state = SafetyState::default();
        assert_eq!(
            gate.can_advance(&state, &toggles(false, false, false), true, Instant::now()),
            SafetyVerdict::Paused
        );
    }

    #[test]
    fn manual_scroll_blocks_for_the_cooldown() {
        let gate = SafetyGate::default();
        let start = Instant::now();
        let mut state = SafetyState::default();
        assert!(state.observe_scroll(-120.0, 50.0, start));

        let all = toggles(true, true, true);
        assert_eq!(
            gate.can_advance(&state, &all, false, start + Duration::from_millis(1500)),
            SafetyVerdict::ManualScroll
        );
        assert_eq!(
            gate.can_advance(&state, &all, false, start + Duration::from_millis(2100)),
            SafetyVerdict::Allowed
        );
        assert_eq!(
            gate.can_advance(&state, &toggles(true, false, true), false, start),
            SafetyVerdict::Allowed
        );
    }

    #[test]
    fn short_or_system_scrolls_are_not_manual() {
        let start = Instant::now();
        let mut state = SafetyState::default();
        assert!(!state.observe_scroll(20.0, 50.0, start));

        state.mark_system_scroll(start, Duration::from_millis(1000));
        assert!(!state.observe_scroll(700.0, 50.0, start + Duration::from_millis(400)));
        assert!(!state.observe_navigation_key(false, start + Duration::from_millis(400)));
        assert!(state.last_manual_scroll.is_none());

        assert!(state.observe_scroll(700.0, 50.0, start + Duration::from_millis(1100)));
    }

    #[test]
    fn manual_navigation_key_counts_as_manual_scroll() {
        let gate = SafetyGate::default();
        let start = Instant::now();
        let mut state = SafetyState::default();
        assert!(!state.observe_navigation_key(true, start));
        assert!(state.observe_navigation_key(false, start));
        assert_eq!(
            gate.can_advance(&state, &toggles(true, true, true), false, start),
            SafetyVerdict::ManualScroll
        );
    }

    #[test]
    fn interaction_blocks_briefly() {
        let gate = SafetyGate::default();
        let start = Instant::now();
        let mut state = SafetyState::default();
        state.observe_interaction(start);

        let all = toggles(true, true, true);
        assert_eq!(
            gate.can_advance(&state, &all, false, start + Duration::from_millis(500)),
            SafetyVerdict::UserInteraction
        );
        assert_eq!(
            gate.can_advance(&state, &all, false, start + Duration::from_millis(1000)),
            SafetyVerdict::Allowed
        );
        assert_eq!(
            gate.can_advance(&state, &toggles(true, true, false), false, start),
            SafetyVerdict::Allowed
        );
    }
}
