use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Successful advances, persisted across sessions by the stats store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionCounters {
    pub scroll_count: u64,
    pub last_scroll_timestamp: Option<DateTime<Utc>>,
}

impl SessionCounters {
    pub fn record(&mut self, at: DateTime<Utc>) {
        self.scroll_count = self.scroll_count.saturating_add(1);
        self.last_scroll_timestamp = Some(at);
    }
}
