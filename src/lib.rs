pub mod advance;
pub mod controller;
pub mod detection;
pub mod host;
pub mod models;
pub mod platform;
pub mod playback;
pub mod safety;
pub mod settings;
pub mod stats;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::{self, Duration, MissedTickBehavior};

use controller::{ControlRequest, Controller, ControllerConfig, ControllerHandle, LogSink};
use host::{FeedHost, SimulatedFeed};
use models::Viewport;
use settings::SettingsStore;
use stats::StatsStore;

const DEMO_LOCATION: &str = "https://www.youtube.com/shorts/demo";
const DEMO_DURATIONS: [f64; 6] = [3.0, 4.5, 2.5, 6.0, 3.5, 5.0];
const DEMO_STEP_MS: u64 = 250;
const DEMO_TIMEOUT_SECS: u64 = 90;

/// Run the controller against a simulated looping feed until it reaches the
/// last item.
pub fn run() -> Result<()> {
    let debug_mode = std::env::var("REELPILOT_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    utils::logging::init(if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    log::info!("ReelPilot demo starting up...");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run_demo())
}

async fn run_demo() -> Result<()> {
    let feed = Arc::new(
        SimulatedFeed::new(DEMO_LOCATION, Viewport::new(390.0, 844.0), &DEMO_DURATIONS)
            .with_looping(true),
    );
    let last_item = DEMO_DURATIONS.len() as u64;

    let settings = Arc::new(SettingsStore::in_memory(Default::default()));
    let stats = Arc::new(StatsStore::in_memory());
    let handle = Controller::spawn(
        feed.clone(),
        Arc::new(LogSink),
        settings,
        stats,
        ControllerConfig::from_env(),
    );

    let outcome = drive_feed(&feed, &handle, last_item).await;

    let state = handle.request(ControlRequest::GetState).await?;
    log::info!("final state: {}", serde_json::to_string(&state)?);
    handle.shutdown().await?;
    outcome
}

async fn drive_feed(feed: &SimulatedFeed, handle: &ControllerHandle, last_item: u64) -> Result<()> {
    let notifier = handle.notifier();
    let mut ticker = time::interval(Duration::from_millis(DEMO_STEP_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let deadline = time::Instant::now() + Duration::from_secs(DEMO_TIMEOUT_SECS);

    while time::Instant::now() < deadline {
        ticker.tick().await;
        for event in feed.step(DEMO_STEP_MS as f64 / 1000.0) {
            notifier.notify(event)?;
        }
        if feed.current_item().map(|id| id.0) == Some(last_item) {
            log::info!("reached the last item at {}", feed.location());
            return Ok(());
        }
    }

    anyhow::bail!("demo feed did not reach the last item in {DEMO_TIMEOUT_SECS}s")
}
