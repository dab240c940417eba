use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::SessionCounters;

/// Unsolicited notifications pushed to the external UI.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type", content = "payload")]
pub enum ControllerEvent {
    StatsUpdate(SessionCounters),
}

/// Outbound channel to whatever UI is listening.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ControllerEvent) -> Result<()>;
}

/// Forwards events into an unbounded channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &ControllerEvent) -> Result<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| anyhow!("event receiver dropped"))
    }
}

/// Writes each event as JSON to the log.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &ControllerEvent) -> Result<()> {
        log::info!("event: {}", serde_json::to_string(event)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stats_update_wire_shape() {
        let event = ControllerEvent::StatsUpdate(SessionCounters {
            scroll_count: 3,
            last_scroll_timestamp: None,
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "statsUpdate",
                "payload": { "scrollCount": 3, "lastScrollTimestamp": null }
            })
        );
    }
}
