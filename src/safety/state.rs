use std::sync::{Arc, Mutex, MutexGuard};

use tokio::time::{Duration, Instant};

/// Environment flags maintained by passive observers, independent of any
/// single advance cycle.
#[derive(Debug, Clone)]
pub struct SafetyState {
    pub foreground: bool,
    pub last_manual_scroll: Option<Instant>,
    pub last_manual_navigation: Option<Instant>,
    pub last_interaction: Option<Instant>,
    /// Scrolls observed before this instant were caused by the orchestrator.
    system_scroll_until: Option<Instant>,
}

impl Default for SafetyState {
    fn default() -> Self {
        Self {
            foreground: true,
            last_manual_scroll: None,
            last_manual_navigation: None,
            last_interaction: None,
            system_scroll_until: None,
        }
    }
}

impl SafetyState {
    pub fn set_foreground(&mut self, visible: bool) {
        self.foreground = visible;
    }

    /// Record a scroll of `delta_y` pixels. Small jitters and scrolls inside a
    /// system-scroll window are not treated as user intent.
    pub fn observe_scroll(&mut self, delta_y: f64, min_distance: f64, now: Instant) -> bool {
        if delta_y.abs() < min_distance || self.is_system_scroll(now) {
            return false;
        }
        self.last_manual_scroll = Some(now);
        true
    }

    pub fn observe_navigation_key(&mut self, synthetic: bool, now: Instant) -> bool {
        if synthetic || self.is_system_scroll(now) {
            return false;
        }
        self.last_manual_navigation = Some(now);
        true
    }

    pub fn observe_interaction(&mut self, now: Instant) {
        self.last_interaction = Some(now);
    }

    /// Flag scrolls for the next `window` as self-initiated.
    pub fn mark_system_scroll(&mut self, now: Instant, window: Duration) {
        let until = now + window;
        self.system_scroll_until = Some(match self.system_scroll_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
    }

    pub fn is_system_scroll(&self, now: Instant) -> bool {
        self.system_scroll_until
            .map(|until| now < until)
            .unwrap_or(false)
    }
}

/// Handle shared between the controller (observers) and the orchestrator
/// (system-scroll marking).
#[derive(Debug, Clone, Default)]
pub struct SharedSafetyState {
    inner: Arc<Mutex<SafetyState>>,
}

impl SharedSafetyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, SafetyState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn snapshot(&self) -> SafetyState {
        self.lock().clone()
    }
}
