use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::models::SessionCounters;

/// Advance counters, optionally mirrored to a JSON file.
pub struct StatsStore {
    path: Option<PathBuf>,
    data: RwLock<SessionCounters>,
}

impl StatsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read stats from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            SessionCounters::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(SessionCounters::default()),
        }
    }

    pub fn counters(&self) -> SessionCounters {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn record_advance(&self, at: DateTime<Utc>) -> Result<SessionCounters> {
        self.mutate(|counters| counters.record(at))
    }

    pub fn reset(&self) -> Result<SessionCounters> {
        self.mutate(|counters| *counters = SessionCounters::default())
    }

    fn mutate(&self, f: impl FnOnce(&mut SessionCounters)) -> Result<SessionCounters> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
        self.persist(&guard)?;
        Ok(guard.clone())
    }

    fn persist(&self, data: &SessionCounters) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write stats to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_reset() {
        let store = StatsStore::in_memory();
        let at = Utc::now();
        store.record_advance(at).unwrap();
        let counters = store.record_advance(at).unwrap();
        assert_eq!(counters.scroll_count, 2);
        assert_eq!(counters.last_scroll_timestamp, Some(at));

        let counters = store.reset().unwrap();
        assert_eq!(counters, SessionCounters::default());
    }

    #[test]
    fn counters_survive_reopen() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("stats.json");

        StatsStore::new(path.clone())
            .unwrap()
            .record_advance(Utc::now())
            .unwrap();

        assert_eq!(StatsStore::new(path).unwrap().counters().scroll_count, 1);
    }
}
