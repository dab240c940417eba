use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rand::Rng;
use serde::Serialize;
use tokio::time::{self, Duration, Instant};

use crate::host::FeedHost;
use crate::models::ItemId;
use crate::platform::PlatformAdapter;
use crate::safety::SharedSafetyState;
use crate::settings::Settings;

use super::method::AdvanceMethod;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Wait after each method before checking whether the feed moved
    pub settle_interval: Duration,
    /// Scrolls within this long after an action are attributed to the orchestrator
    pub system_scroll_window: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settle_interval: Duration::from_millis(700),
            system_scroll_window: Duration::from_millis(1200),
        }
    }
}

/// Timing and budget for one advance run, captured from settings when the
/// run is scheduled.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvancePlan {
    pub pre_delay: Duration,
    pub retry_attempts: u32,
    pub scroll_factor: f64,
}

impl AdvancePlan {
    /// Plan for an automatic advance: `delayAfterEnd` plus uniform jitter in
    /// `[0, randomExtraDelay]`.
    pub fn after_end(settings: &Settings) -> Self {
        let jitter = if settings.random_extra_delay > 0 {
            rand::thread_rng().gen_range(0..=settings.random_extra_delay)
        } else {
            0
        };
        Self {
            pre_delay: Duration::from_millis(settings.delay_after_end.saturating_add(jitter)),
            ..Self::immediate(settings)
        }
    }

    /// Plan for a user-requested advance: no pre-delay.
    pub fn immediate(settings: &Settings) -> Self {
        Self {
            pre_delay: Duration::ZERO,
            retry_attempts: settings.retry_attempts.max(1),
            scroll_factor: settings.scroll_factor,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceFailure {
    /// Another run holds the scroll-lock.
    Locked,
    /// The adapter offers no methods.
    NoMethods,
    /// Every method in every attempt ran without the active item changing.
    Exhausted,
}

impl AdvanceFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvanceFailure::Locked => "locked",
            AdvanceFailure::NoMethods => "no_methods",
            AdvanceFailure::Exhausted => "exhausted",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOutcome {
    pub success: bool,
    pub method: Option<AdvanceMethod>,
    pub attempt: Option<u32>,
    /// Active item after a successful advance.
    pub item: Option<ItemId>,
    pub reason: Option<AdvanceFailure>,
}

impl AdvanceOutcome {
    fn succeeded(method: AdvanceMethod, attempt: u32, item: ItemId) -> Self {
        Self {
            success: true,
            method: Some(method),
            attempt: Some(attempt),
            item: Some(item),
            reason: None,
        }
    }

    pub fn failed(reason: AdvanceFailure) -> Self {
        Self {
            success: false,
            method: None,
            attempt: None,
            item: None,
            reason: Some(reason),
        }
    }
}

/// Executes advance methods under an exclusive scroll-lock.
///
/// Clones share the lock, so at most one run is in flight across all of them.
#[derive(Clone)]
pub struct AdvanceOrchestrator {
    config: OrchestratorConfig,
    locked: Arc<AtomicBool>,
    safety: SharedSafetyState,
}

struct ScrollLockGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for ScrollLockGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl AdvanceOrchestrator {
    pub fn new(config: OrchestratorConfig, safety: SharedSafetyState) -> Self {
        Self {
            config,
            locked: Arc::new(AtomicBool::new(false)),
            safety,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn try_lock(&self) -> Option<ScrollLockGuard> {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScrollLockGuard {
                flag: Arc::clone(&self.locked),
            })
    }

    /// Move the feed past `previous`.
    ///
    /// Waits `plan.pre_delay`, then runs every method of `adapter` in order for
    /// up to `plan.retry_attempts` rounds, stopping at the first method after
    /// which the detector reports a different active item.
    pub async fn advance<A>(
        &self,
        host: &dyn FeedHost,
        adapter: &A,
        previous: Option<ItemId>,
        plan: &AdvancePlan,
    ) -> AdvanceOutcome
    where
        A: PlatformAdapter + ?Sized,
    {
        let Some(_guard) = self.try_lock() else {
            log_debug!("advance rejected: scroll-lock held");
            return AdvanceOutcome::failed(AdvanceFailure::Locked);
        };

        if !plan.pre_delay.is_zero() {
            time::sleep(plan.pre_delay).await;
        }

        let methods = adapter.advance_methods();
        if methods.is_empty() {
            log_warn!("{} offers no advance methods", adapter.display_name());
            return AdvanceOutcome::failed(AdvanceFailure::NoMethods);
        }

        let rounds = plan.retry_attempts.max(1);
        for attempt in 1..=rounds {
            for method in &methods {
                if let Some(item) = self
                    .try_method(host, adapter, *method, previous, plan.scroll_factor)
                    .await
                {
                    log_info!(
                        "advanced {} -> {} via {} (attempt {}/{})",
                        previous.map(|id| id.to_string()).unwrap_or_else(|| "none".into()),
                        item,
                        method.name(),
                        attempt,
                        rounds
                    );
                    return AdvanceOutcome::succeeded(*method, attempt, item);
                }
            }
            log_debug!("advance attempt {}/{} made no progress", attempt, rounds);
        }

        log_warn!(
            "advance failed on {} after {} attempt(s) x {} method(s)",
            adapter.display_name(),
            rounds,
            methods.len()
        );
        AdvanceOutcome::failed(AdvanceFailure::Exhausted)
    }

    /// Run one method and report the new active item if the feed moved.
    async fn try_method<A>(
        &self,
        host: &dyn FeedHost,
        adapter: &A,
        method: AdvanceMethod,
        previous: Option<ItemId>,
        scroll_factor: f64,
    ) -> Option<ItemId>
    where
        A: PlatformAdapter + ?Sized,
    {
        let viewport = host.viewport();
        let Some(action) = method.to_action(previous, &viewport, scroll_factor) else {
            log_debug!("{} not applicable without a current item", method.name());
            return None;
        };

        self.safety
            .lock()
            .mark_system_scroll(Instant::now(), self.system_scroll_window());

        if let Err(err) = host.perform(&action) {
            log_warn!("{} failed: {err:#}", method.name());
            return None;
        }

        time::sleep(self.config.settle_interval).await;

        let current = adapter.find_active_item(host).map(|item| item.id)?;
        if Some(current) != previous {
            Some(current)
        } else {
            None
        }
    }

    fn system_scroll_window(&self) -> Duration {
        self.config
            .system_scroll_window
            .max(self.config.settle_interval)
    }
}
