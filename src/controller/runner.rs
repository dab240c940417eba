use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::advance::{
    AdvanceFailure, AdvanceOrchestrator, AdvanceOutcome, AdvancePlan, OrchestratorConfig,
};
use crate::host::{FeedHost, HostEvent, HotkeyAction};
use crate::models::{ItemId, VideoInfo};
use crate::platform::{Platform, PlatformAdapter};
use crate::playback::{EndDetectorConfig, EndReason, PlaybackSession, PlaybackSignal, PlaybackSnapshot};
use crate::safety::{SafetyConfig, SafetyGate, SharedSafetyState};
use crate::settings::SettingsStore;
use crate::stats::StatsStore;

use super::commands::{ControlRequest, ControlResponse, TestScrollResult};
use super::events::{ControllerEvent, EventSink};
use super::state::{ControllerStatus, TrackingContext};

// Set to false to silence this module's logging
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub(super) type Reply = oneshot::Sender<Result<ControlResponse, String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AdvanceTrigger {
    EndOfPlayback(EndReason),
    Manual,
    Hotkey,
}

pub(super) enum ControllerMessage {
    Host(HostEvent),
    Control {
        request: ControlRequest,
        reply: Reply,
    },
    StartTracking {
        context: Uuid,
    },
    Redetect {
        context: Uuid,
    },
    AdvanceFinished {
        context: Uuid,
        trigger: AdvanceTrigger,
        outcome: AdvanceOutcome,
        reply: Option<Reply>,
    },
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Feeds navigate without reloading, so the location is polled
    pub navigation_poll_interval: Duration,
    /// Wait after entering an eligible page before tracking starts
    pub initial_settle: Duration,
    /// Quiet period that coalesces tree/scroll notifications into one re-detection
    pub debounce: Duration,
    /// Wait after a successful advance before re-attaching
    pub reattach_grace: Duration,
    /// Number of re-detection polls after a successful advance
    pub post_advance_polls: u32,
    pub post_advance_poll_interval: Duration,

    pub end_detector: EndDetectorConfig,
    pub safety: SafetyConfig,
    pub orchestrator: OrchestratorConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            navigation_poll_interval: Duration::from_millis(1000),
            initial_settle: Duration::from_millis(1500),
            debounce: Duration::from_millis(150),
            reattach_grace: Duration::from_millis(300),
            post_advance_polls: 5,
            post_advance_poll_interval: Duration::from_millis(400),
            end_detector: EndDetectorConfig::default(),
            safety: SafetyConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Defaults, with a short initial settle when `REELPILOT_DEBUG` is set.
    pub fn from_env() -> Self {
        let debug_mode = std::env::var("REELPILOT_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let mut config = Self::default();
        if debug_mode {
            config.initial_settle = Duration::from_millis(200);
        }
        config
    }
}

#[derive(Default)]
struct Timers {
    start: Option<JoinHandle<()>>,
    debounce: Option<JoinHandle<()>>,
    reattach: Option<JoinHandle<()>>,
}

impl Timers {
    fn abort_all(&mut self) {
        for slot in [&mut self.start, &mut self.debounce, &mut self.reattach] {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }

    fn start_pending(&self) -> bool {
        self.start
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

fn replace_timer(slot: &mut Option<JoinHandle<()>>, handle: JoinHandle<()>) {
    if let Some(previous) = slot.replace(handle) {
        previous.abort();
    }
}

pub(super) fn respond(reply: Option<Reply>, response: Result<ControlResponse, String>) {
    if let Some(reply) = reply {
        let _ = reply.send(response);
    }
}

/// Top-level coordinator. Owns every piece of mutable state and runs on a
/// single task; timers and advance runs report back through its channel.
pub struct Controller {
    pub(super) host: Arc<dyn FeedHost>,
    pub(super) sink: Arc<dyn EventSink>,
    pub(super) settings: Arc<SettingsStore>,
    pub(super) stats: Arc<StatsStore>,
    pub(super) config: ControllerConfig,
    pub(super) status: ControllerStatus,
    pub(super) session: PlaybackSession,
    pub(super) safety: SharedSafetyState,
    pub(super) gate: SafetyGate,
    pub(super) orchestrator: AdvanceOrchestrator,
    pub(super) paused: bool,
    pub(super) last_location: Option<String>,
    pub(super) last_video: Option<VideoInfo>,
    pub(super) last_error: Option<String>,
    timers: Timers,
    tx: mpsc::UnboundedSender<ControllerMessage>,
}

impl Controller {
    /// Start the controller loop on the current tokio runtime.
    pub fn spawn(
        host: Arc<dyn FeedHost>,
        sink: Arc<dyn EventSink>,
        settings: Arc<SettingsStore>,
        stats: Arc<StatsStore>,
        config: ControllerConfig,
    ) -> ControllerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let safety = SharedSafetyState::new();
        let controller = Controller {
            host,
            sink,
            settings,
            stats,
            session: PlaybackSession::new(config.end_detector.clone()),
            gate: SafetyGate::new(config.safety.clone()),
            orchestrator: AdvanceOrchestrator::new(config.orchestrator.clone(), safety.clone()),
            safety,
            config,
            status: ControllerStatus::Unattached,
            paused: false,
            last_location: None,
            last_video: None,
            last_error: None,
            timers: Timers::default(),
            tx: tx.clone(),
        };

        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(controller.run(rx, cancel_token.clone()));

        ControllerHandle {
            tx,
            cancel_token,
            task,
        }
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<ControllerMessage>,
        cancel_token: CancellationToken,
    ) {
        let mut navigation = time::interval(self.config.navigation_poll_interval);
        navigation.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    log_info!("controller shutting down");
                    break;
                }
                _ = navigation.tick() => self.check_location(),
                message = rx.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => break,
                },
            }
        }

        self.leave_context();
    }

    fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::Host(event) => self.handle_host_event(event),
            ControllerMessage::Control { request, reply } => self.handle_control(request, reply),
            ControllerMessage::StartTracking { context } => self.start_tracking(context),
            ControllerMessage::Redetect { context } => {
                if self.status.is_tracking_context(context) {
                    self.redetect();
                }
            }
            ControllerMessage::AdvanceFinished {
                context,
                trigger,
                outcome,
                reply,
            } => self.finish_advance(context, trigger, outcome, reply),
        }
    }

    fn handle_host_event(&mut self, event: HostEvent) {
        let now = Instant::now();
        match event {
            HostEvent::LocationChanged => self.check_location(),
            HostEvent::TreeChanged => self.schedule_redetect(),
            HostEvent::Scrolled { delta_y } => {
                let distance = self.gate.config().manual_scroll_distance;
                if self.safety.lock().observe_scroll(delta_y, distance, now) {
                    log_debug!("manual scroll of {:.0}px", delta_y);
                }
                self.schedule_redetect();
            }
            HostEvent::Playback {
                item,
                signal,
                snapshot,
            } => self.handle_playback(item, signal, snapshot),
            HostEvent::VisibilityChanged { visible } => {
                self.safety.lock().set_foreground(visible);
            }
            HostEvent::PointerDown => self.safety.lock().observe_interaction(now),
            HostEvent::NavigationKey { synthetic } => {
                if self.safety.lock().observe_navigation_key(synthetic, now) {
                    log_debug!("manual navigation key");
                }
            }
            HostEvent::Hotkey(action) => self.handle_hotkey(action),
        }
    }

    fn handle_hotkey(&mut self, action: HotkeyAction) {
        if !self.settings.settings().hotkeys.enabled {
            log_debug!("hotkey {:?} ignored: hotkeys disabled", action);
            return;
        }
        match action {
            HotkeyAction::AdvanceNow => self.manual_advance(AdvanceTrigger::Hotkey, None),
            HotkeyAction::TogglePause => {
                self.toggle_pause();
            }
        }
    }

    // ── Page context ───────────────────────────────────────────

    fn check_location(&mut self) {
        let location = self.host.location();
        if self.last_location.as_deref() == Some(location.as_str()) {
            return;
        }
        let first_check = self.last_location.is_none();
        self.last_location = Some(location.clone());

        // Per-item URL rewrites keep the context, its id and any run in flight.
        if let Some(context) = self.status.context_mut() {
            if context.is_same_feed(&location) {
                log_debug!(
                    "location changed within {}: {}",
                    context.platform.display_name(),
                    location
                );
                context.location = location;
                return;
            }
        }

        if !first_check {
            log_info!("navigation to {}", location);
        }
        self.leave_context();

        let Some(platform) = Platform::detect(&location) else {
            log_debug!("no supported platform at {}", location);
            return;
        };

        let context = TrackingContext::new(platform, location);
        log_info!(
            "matched {} (feed page: {})",
            platform.display_name(),
            context.is_eligible_page()
        );
        self.status = ControllerStatus::Attached(context.clone());
        self.schedule_start(&context);
    }

    fn can_track(&self, context: &TrackingContext) -> bool {
        context.is_eligible_page()
            && self
                .settings
                .settings()
                .is_active_for(context.platform.site_id())
    }

    fn schedule_start(&mut self, context: &TrackingContext) {
        if !self.can_track(context) {
            log_debug!(
                "not tracking {}: ineligible page or site disabled",
                context.location
            );
            return;
        }

        let tx = self.tx.clone();
        let id = context.id;
        let delay = self.config.initial_settle;
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(ControllerMessage::StartTracking { context: id });
        });
        replace_timer(&mut self.timers.start, handle);
    }

    fn start_tracking(&mut self, id: Uuid) {
        let ControllerStatus::Attached(context) = &self.status else {
            return;
        };
        if context.id != id || !self.can_track(context) {
            return;
        }

        let context = context.clone();
        log_info!(
            "tracking {} at {}",
            context.platform.display_name(),
            context.location
        );
        self.status = ControllerStatus::Tracking(context);
        self.redetect();
    }

    /// Stop tracking but stay attached to the platform, e.g. when the site is
    /// disabled in settings.
    fn stop_tracking(&mut self) {
        let ControllerStatus::Tracking(context) = &self.status else {
            return;
        };
        log_info!("tracking stopped for {}", context.platform.display_name());
        let renewed = context.renewed();
        self.timers.abort_all();
        self.session.detach();
        self.status = ControllerStatus::Attached(renewed);
    }

    fn leave_context(&mut self) {
        self.timers.abort_all();
        self.session.detach();
        self.status = ControllerStatus::Unattached;
    }

    /// Start or stop tracking after the enable switches changed.
    pub(super) fn refresh_enablement(&mut self) {
        match self.status.clone() {
            ControllerStatus::Tracking(context) if !self.can_track(&context) => {
                self.stop_tracking();
            }
            ControllerStatus::Attached(context)
                if self.can_track(&context) && !self.timers.start_pending() =>
            {
                self.schedule_start(&context);
            }
            _ => {}
        }
    }

    // ── Active item ────────────────────────────────────────────

    fn redetect(&mut self) {
        let Some(context) = self.status.tracking() else {
            return;
        };
        let platform = context.platform;

        match platform.find_active_item(&*self.host) {
            None => log_debug!("no active item on {}", platform.display_name()),
            Some(item) => {
                if self.session.item() == Some(item.id) {
                    return;
                }
                log_info!("attached to {}", item.id);
                self.session.attach(item.id);
                self.last_video = Some(VideoInfo {
                    duration: item.duration,
                    current_time: item.position,
                });
            }
        }
    }

    fn schedule_redetect(&mut self) {
        let Some(context) = self.status.tracking() else {
            return;
        };
        let id = context.id;
        let tx = self.tx.clone();
        let delay = self.config.debounce;
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(ControllerMessage::Redetect { context: id });
        });
        replace_timer(&mut self.timers.debounce, handle);
    }

    fn schedule_reattach(&mut self, id: Uuid) {
        let tx = self.tx.clone();
        let grace = self.config.reattach_grace;
        let polls = self.config.post_advance_polls.max(1);
        let interval = self.config.post_advance_poll_interval;
        let handle = tokio::spawn(async move {
            time::sleep(grace).await;
            for _ in 0..polls {
                if tx.send(ControllerMessage::Redetect { context: id }).is_err() {
                    break;
                }
                time::sleep(interval).await;
            }
        });
        replace_timer(&mut self.timers.reattach, handle);
    }

    // ── Playback and advancing ─────────────────────────────────

    fn handle_playback(&mut self, item: ItemId, signal: PlaybackSignal, snapshot: PlaybackSnapshot) {
        if self.status.tracking().is_none() {
            return;
        }
        if self.session.item() == Some(item) {
            self.last_video = Some(VideoInfo {
                duration: snapshot.duration,
                current_time: snapshot.position,
            });
        }
        if let Some(reason) = self.session.observe(item, signal, &snapshot) {
            log_info!("{} finished ({})", item, reason.as_str());
            self.on_end(reason);
        }
    }

    fn on_end(&mut self, reason: EndReason) {
        let Some(context) = self.status.tracking().cloned() else {
            return;
        };
        if self.orchestrator.is_locked() {
            log_debug!("end event dropped: advance already in flight");
            return;
        }

        let settings = self.settings.settings();
        let verdict = self.gate.can_advance(
            &self.safety.snapshot(),
            &settings.safety,
            self.paused,
            Instant::now(),
        );
        if !verdict.is_allowed() {
            log_debug!("advance suppressed: {}", verdict.as_str());
            self.session.skip_cycle();
            return;
        }

        self.spawn_advance(
            context,
            AdvancePlan::after_end(&settings),
            AdvanceTrigger::EndOfPlayback(reason),
            None,
        );
    }

    /// Advance right away, without an end event and without consulting the
    /// safety gate.
    pub(super) fn manual_advance(&mut self, trigger: AdvanceTrigger, reply: Option<Reply>) {
        let Some(context) = self.status.tracking().cloned() else {
            log_debug!("manual advance ignored: not tracking a feed");
            let scroll_count = self.stats.counters().scroll_count;
            respond(
                reply,
                Ok(ControlResponse::TestScroll(TestScrollResult {
                    success: false,
                    scroll_count,
                })),
            );
            return;
        };
        let settings = self.settings.settings();
        self.spawn_advance(context, AdvancePlan::immediate(&settings), trigger, reply);
    }

    fn spawn_advance(
        &mut self,
        context: TrackingContext,
        plan: AdvancePlan,
        trigger: AdvanceTrigger,
        reply: Option<Reply>,
    ) {
        let previous = self
            .session
            .item()
            .or_else(|| context.platform.find_active_item(&*self.host).map(|item| item.id));
        let host = Arc::clone(&self.host);
        let orchestrator = self.orchestrator.clone();
        let tx = self.tx.clone();

        log_debug!(
            "advance scheduled ({:?}) in {}ms",
            trigger,
            plan.pre_delay.as_millis()
        );
        tokio::spawn(async move {
            let outcome = orchestrator
                .advance(&*host, &context.platform, previous, &plan)
                .await;
            let _ = tx.send(ControllerMessage::AdvanceFinished {
                context: context.id,
                trigger,
                outcome,
                reply,
            });
        });
    }

    fn finish_advance(
        &mut self,
        context: Uuid,
        trigger: AdvanceTrigger,
        outcome: AdvanceOutcome,
        reply: Option<Reply>,
    ) {
        if !self.status.is_tracking_context(context) {
            log_debug!("discarding advance result from a previous page context");
            let scroll_count = self.stats.counters().scroll_count;
            respond(
                reply,
                Ok(ControlResponse::TestScroll(TestScrollResult {
                    success: false,
                    scroll_count,
                })),
            );
            return;
        }

        if outcome.success {
            let counters = match self.stats.record_advance(Utc::now()) {
                Ok(counters) => counters,
                Err(err) => {
                    log_error!("failed to persist advance count: {err:#}");
                    self.stats.counters()
                }
            };
            self.last_error = None;
            if let Err(err) = self.sink.emit(&ControllerEvent::StatsUpdate(counters)) {
                log_warn!("stats update not delivered: {err:#}");
            }
            self.session.detach();
            self.schedule_reattach(context);
        } else {
            match outcome.reason {
                Some(AdvanceFailure::Locked) => {
                    log_debug!("{:?} advance skipped: another run in flight", trigger);
                }
                reason => {
                    let message = format!(
                        "advance failed: {}",
                        reason.map(|reason| reason.as_str()).unwrap_or("unknown")
                    );
                    log_warn!("{} ({:?})", message, trigger);
                    self.last_error = Some(message);
                    self.session.skip_cycle();
                }
            }
        }

        let scroll_count = self.stats.counters().scroll_count;
        respond(
            reply,
            Ok(ControlResponse::TestScroll(TestScrollResult {
                success: outcome.success,
                scroll_count,
            })),
        );
    }

    pub(super) fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        log_info!("auto-advance {}", if self.paused { "paused" } else { "resumed" });
        self.paused
    }
}

/// Owner's handle to a running controller.
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<ControllerMessage>,
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl ControllerHandle {
    /// Cloneable sender for the host's passive observers.
    pub fn notifier(&self) -> HostNotifier {
        HostNotifier {
            tx: self.tx.clone(),
        }
    }

    pub fn notify(&self, event: HostEvent) -> Result<()> {
        self.tx
            .send(ControllerMessage::Host(event))
            .map_err(|_| anyhow!("controller is not running"))
    }

    pub async fn request(&self, request: ControlRequest) -> Result<ControlResponse> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(ControllerMessage::Control { request, reply })
            .map_err(|_| anyhow!("controller is not running"))?;
        response
            .await
            .context("controller dropped the request")?
            .map_err(|err| anyhow!(err))
    }

    pub async fn shutdown(self) -> Result<()> {
        self.cancel_token.cancel();
        self.task.await.context("controller task failed to join")
    }
}

#[derive(Clone)]
pub struct HostNotifier {
    tx: mpsc::UnboundedSender<ControllerMessage>,
}

impl HostNotifier {
    pub fn notify(&self, event: HostEvent) -> Result<()> {
        self.tx
            .send(ControllerMessage::Host(event))
            .map_err(|_| anyhow!("controller is not running"))
    }
}
