use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Result};

use crate::models::{CandidateItem, ItemId, PlaybackState, Rect, Viewport};
use crate::playback::{PlaybackSignal, PlaybackSnapshot};

use super::{ActionKind, FeedHost, HostAction, HostEvent};

/// In-process vertical feed: one full-viewport item per "page", stacked top
/// to bottom, with the current item playing.
///
/// Drives the demo binary and the controller tests. Only the current item and
/// its direct neighbours are reported as candidates, which is how real feeds
/// virtualise their item lists.
pub struct SimulatedFeed {
    inner: Mutex<FeedState>,
}

struct FeedState {
    location: String,
    viewport: Viewport,
    items: Vec<SimItem>,
    current: usize,
    looping: bool,
    responsive: HashSet<ActionKind>,
    failing: HashSet<ActionKind>,
    performed: Vec<HostAction>,
}

struct SimItem {
    id: ItemId,
    duration: Option<f64>,
    position: f64,
    state: PlaybackState,
}

impl SimulatedFeed {
    pub fn new(location: impl Into<String>, viewport: Viewport, durations: &[f64]) -> Self {
        let items = durations
            .iter()
            .enumerate()
            .map(|(idx, duration)| SimItem {
                id: ItemId(idx as u64 + 1),
                duration: Some(*duration),
                position: 0.0,
                state: if idx == 0 {
                    PlaybackState::Playing
                } else {
                    PlaybackState::Paused
                },
            })
            .collect();

        Self {
            inner: Mutex::new(FeedState {
                location: location.into(),
                viewport,
                items,
                current: 0,
                looping: false,
                responsive: [
                    ActionKind::DispatchKey,
                    ActionKind::ScrollBy,
                    ActionKind::ScrollIntoView,
                    ActionKind::ClickNextControl,
                ]
                .into_iter()
                .collect(),
                failing: HashSet::new(),
                performed: Vec::new(),
            }),
        }
    }

    /// Replay items from the start instead of stopping at the end, the way
    /// most short-form feeds behave.
    pub fn with_looping(self, looping: bool) -> Self {
        self.state().looping = looping;
        self
    }

    /// Only actions of these kinds move the feed; everything else is a no-op.
    pub fn set_responsive(&self, kinds: &[ActionKind]) {
        self.state().responsive = kinds.iter().copied().collect();
    }

    /// Actions of these kinds return an error from [`FeedHost::perform`].
    pub fn set_failing(&self, kinds: &[ActionKind]) {
        self.state().failing = kinds.iter().copied().collect();
    }

    pub fn set_location(&self, location: impl Into<String>) {
        self.state().location = location.into();
    }

    pub fn performed(&self) -> Vec<HostAction> {
        self.state().performed.clone()
    }

    pub fn current_item(&self) -> Option<ItemId> {
        let state = self.state();
        state.items.get(state.current).map(|item| item.id)
    }

    /// Advance the current item's playback clock by `dt` seconds and return
    /// the media signals the host would have observed.
    pub fn step(&self, dt: f64) -> Vec<HostEvent> {
        let mut state = self.state();
        let looping = state.looping;
        let current = state.current;
        let Some(item) = state.items.get_mut(current) else {
            return Vec::new();
        };
        if item.state != PlaybackState::Playing {
            return Vec::new();
        }

        let mut events = Vec::new();
        let duration = item.duration.unwrap_or(f64::INFINITY);
        item.position += dt;

        if item.position >= duration {
            if looping {
                item.position -= duration;
            } else {
                item.position = duration;
                item.state = PlaybackState::Ended;
                events.push(HostEvent::Playback {
                    item: item.id,
                    signal: PlaybackSignal::Ended,
                    snapshot: PlaybackSnapshot {
                        position: item.position,
                        duration: item.duration,
                        ended: true,
                    },
                });
                return events;
            }
        }

        events.push(HostEvent::Playback {
            item: item.id,
            signal: PlaybackSignal::TimeUpdate,
            snapshot: PlaybackSnapshot {
                position: item.position,
                duration: item.duration,
                ended: false,
            },
        });
        events
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl FeedState {
    fn move_to(&mut self, next: usize) {
        if let Some(item) = self.items.get_mut(self.current) {
            item.state = PlaybackState::Paused;
        }
        self.current = next;
        if let Some(item) = self.items.get_mut(next) {
            item.position = 0.0;
            item.state = PlaybackState::Playing;
        }
    }
}

impl FeedHost for SimulatedFeed {
    fn location(&self) -> String {
        self.state().location.clone()
    }

    fn viewport(&self) -> Viewport {
        self.state().viewport
    }

    fn candidates(&self) -> Vec<CandidateItem> {
        let state = self.state();
        let height = state.viewport.height;
        let lo = state.current.saturating_sub(1);
        let hi = (state.current + 1).min(state.items.len().saturating_sub(1));

        (lo..=hi)
            .filter_map(|idx| state.items.get(idx).map(|item| (idx, item)))
            .map(|(idx, item)| {
                let offset = idx as f64 - state.current as f64;
                let is_current = idx == state.current;
                CandidateItem {
                    id: item.id,
                    rect: Rect::new(0.0, offset * height, state.viewport.width, height),
                    state: item.state,
                    ready_state: if is_current { 4 } else { 1 },
                    duration: if is_current { item.duration } else { None },
                    position: item.position,
                }
            })
            .collect()
    }

    fn perform(&self, action: &HostAction) -> Result<()> {
        let mut state = self.state();
        state.performed.push(action.clone());

        let kind = action.kind();
        if state.failing.contains(&kind) {
            bail!("{kind:?} is unavailable on this page");
        }
        if !state.responsive.contains(&kind) {
            return Ok(());
        }

        let next = state.current + 1;
        if next < state.items.len() {
            state.move_to(next);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> SimulatedFeed {
        SimulatedFeed::new(
            "https://www.youtube.com/shorts/abc",
            Viewport::new(400.0, 800.0),
            &[3.0, 4.0, 5.0],
        )
    }

    #[test]
    fn candidates_cover_current_and_neighbours() {
        let feed = feed();
        let ids: Vec<_> = feed.candidates().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![ItemId(1), ItemId(2)]);

        feed.perform(&HostAction::ClickNextControl).unwrap();
        let ids: Vec<_> = feed.candidates().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![ItemId(1), ItemId(2), ItemId(3)]);
        assert_eq!(feed.current_item(), Some(ItemId(2)));
    }

    #[test]
    fn unresponsive_actions_are_recorded_but_do_not_move() {
        let feed = feed();
        feed.set_responsive(&[ActionKind::ClickNextControl]);
        feed.perform(&HostAction::ScrollBy { dy: 760.0 }).unwrap();
        assert_eq!(feed.current_item(), Some(ItemId(1)));
        assert_eq!(feed.performed().len(), 1);
    }

    #[test]
    fn failing_actions_return_errors() {
        let feed = feed();
        feed.set_failing(&[ActionKind::ScrollIntoView]);
        assert!(feed
            .perform(&HostAction::ScrollIntoView { after: ItemId(1) })
            .is_err());
    }

    #[test]
    fn step_emits_ended_without_looping() {
        let feed = feed();
        let events = feed.step(3.5);
        assert!(matches!(
            events.as_slice(),
            [HostEvent::Playback {
                signal: PlaybackSignal::Ended,
                ..
            }]
        ));
        assert!(feed.step(1.0).is_empty());
    }

    #[test]
    fn step_wraps_when_looping() {
        let feed = feed().with_looping(true);
        feed.step(2.9);
        let events = feed.step(0.2);
        match events.as_slice() {
            [HostEvent::Playback { snapshot, .. }] => assert!(snapshot.position < 0.5),
            other => panic!("unexpected events {other:?}"),
        }
    }
}
