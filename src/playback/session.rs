use serde::{Deserialize, Serialize};

use crate::models::ItemId;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Watching,
    Fired,
}

/// Which detection path declared the item finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    EndedEvent,
    ThresholdReached,
    LoopDetected,
    PauseAtEnd,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::EndedEvent => "ended_event",
            EndReason::ThresholdReached => "threshold_reached",
            EndReason::LoopDetected => "loop_detected",
            EndReason::PauseAtEnd => "pause_at_end",
        }
    }
}

/// Media lifecycle signal observed on an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackSignal {
    TimeUpdate,
    Ended,
    Pause,
    Play,
    Seeked,
}

/// Media state carried alongside each signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub position: f64,
    pub duration: Option<f64>,
    /// The media element's own "ended" flag.
    pub ended: bool,
}

/// Timing thresholds for end-of-playback detection, in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct EndDetectorConfig {
    /// Remaining time under which the item counts as finished
    pub end_threshold: f64,
    /// Remaining time under which the item is flagged as "was near end"
    pub near_end: f64,
    /// Position under which a jump back counts as a restart
    pub loop_reset: f64,
    /// Items shorter than this are never end-detected
    pub min_duration: f64,
    /// A play signal at or below this position re-arms the session
    pub replay_start: f64,
}

impl Default for EndDetectorConfig {
    fn default() -> Self {
        Self {
            end_threshold: 0.15,
            near_end: 0.5,
            loop_reset: 2.0,
            min_duration: 1.0,
            replay_start: 0.5,
        }
    }
}

/// End-of-playback state for the single attached item.
///
/// `observe` returns `Some(reason)` exactly once per play-through; after that
/// the session stays `Fired` until [`reset`](Self::reset), a seek away from
/// the end, or a replay from the start.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSession {
    config: EndDetectorConfig,
    item: Option<ItemId>,
    phase: SessionPhase,
    last_position: Option<f64>,
    was_near_end: bool,
    /// Set by `skip_cycle`: only a restart of the item can produce the next end.
    awaiting_restart: bool,
}

impl PlaybackSession {
    pub fn new(config: EndDetectorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn item(&self) -> Option<ItemId> {
        self.item
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn has_fired(&self) -> bool {
        self.phase == SessionPhase::Fired
    }

    /// Bind to `item`, discarding any state from the previous item.
    pub fn attach(&mut self, item: ItemId) {
        self.item = Some(item);
        self.phase = SessionPhase::Watching;
        self.last_position = None;
        self.was_near_end = false;
        self.awaiting_restart = false;
    }

    pub fn detach(&mut self) {
        self.item = None;
        self.phase = SessionPhase::Idle;
        self.last_position = None;
        self.was_near_end = false;
        self.awaiting_restart = false;
    }

    /// Re-arm the attached item so it can fire again.
    pub fn reset(&mut self) {
        if self.item.is_some() {
            self.phase = SessionPhase::Watching;
        }
        self.was_near_end = false;
        self.awaiting_restart = false;
    }

    /// Give up on the current play-through without advancing. The session
    /// re-arms, but the tail of this play-through can no longer fire: the
    /// next end is the loop back to the start (or a replay/seek).
    pub fn skip_cycle(&mut self) {
        self.reset();
        if self.item.is_some() {
            self.awaiting_restart = true;
        }
    }

    pub fn is_awaiting_restart(&self) -> bool {
        self.awaiting_restart
    }

    pub fn observe(
        &mut self,
        item: ItemId,
        signal: PlaybackSignal,
        snapshot: &PlaybackSnapshot,
    ) -> Option<EndReason> {
        if self.item != Some(item) || self.phase == SessionPhase::Idle {
            return None;
        }

        let duration = snapshot.duration?;
        if !duration.is_finite() || duration < self.config.min_duration {
            return None;
        }

        let position = snapshot.position;
        let remaining = duration - position;

        match signal {
            PlaybackSignal::Seeked => {
                if remaining > self.config.loop_reset {
                    self.phase = SessionPhase::Watching;
                    self.was_near_end = false;
                    self.awaiting_restart = false;
                }
                self.last_position = Some(position);
                None
            }
            PlaybackSignal::Play => {
                if position <= self.config.replay_start {
                    self.phase = SessionPhase::Watching;
                    self.was_near_end = false;
                    self.awaiting_restart = false;
                }
                self.last_position = Some(position);
                None
            }
            _ if self.phase == SessionPhase::Fired => None,
            PlaybackSignal::TimeUpdate => self.on_time_update(position, remaining),
            _ if self.awaiting_restart => None,
            PlaybackSignal::Ended => self.fire(EndReason::EndedEvent),
            PlaybackSignal::Pause => {
                if snapshot.ended && remaining < self.config.end_threshold {
                    self.fire(EndReason::PauseAtEnd)
                } else {
                    self.last_position = Some(position);
                    None
                }
            }
        }
    }

    fn on_time_update(&mut self, position: f64, remaining: f64) -> Option<EndReason> {
        let jumped_back = self
            .last_position
            .map(|last| position < last)
            .unwrap_or(false);
        self.last_position = Some(position);

        let restarted = jumped_back && position < self.config.loop_reset;
        if restarted {
            self.awaiting_restart = false;
            if self.was_near_end {
                return self.fire(EndReason::LoopDetected);
            }
        }

        if !self.awaiting_restart && remaining < self.config.end_threshold {
            return self.fire(EndReason::ThresholdReached);
        }

        if remaining < self.config.near_end {
            self.was_near_end = true;
        }
        None
    }

    fn fire(&mut self, reason: EndReason) -> Option<EndReason> {
        if self.phase == SessionPhase::Fired {
            return None;
        }
        self.phase = SessionPhase::Fired;
        self.was_near_end = false;
        Some(reason)
    }
}
