use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fs, path::PathBuf, sync::RwLock};

pub const SCROLL_FACTOR_RANGE: (f64, f64) = (0.5, 1.5);
pub const RETRY_ATTEMPTS_RANGE: (u32, u32) = (1, 5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    pub enabled: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SafetySettings {
    pub stop_on_tab_inactive: bool,
    pub stop_on_manual_scroll: bool,
    pub pause_on_interaction: bool,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            stop_on_tab_inactive: true,
            stop_on_manual_scroll: true,
            pause_on_interaction: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HotkeySettings {
    pub enabled: bool,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// User configuration. Every field has a default, so any partial document
/// deserializes by filling the gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub global_enabled: bool,
    pub sites: BTreeMap<String, SiteSettings>,
    /// Pause after an item ends before advancing (ms)
    pub delay_after_end: u64,
    /// Upper bound of the uniform jitter added to `delay_after_end` (ms)
    pub random_extra_delay: u64,
    /// Fraction of the viewport height scrolled by container-scroll advances
    pub scroll_factor: f64,
    pub retry_attempts: u32,
    pub safety: SafetySettings,
    pub hotkeys: HotkeySettings,
}

impl Default for Settings {
    fn default() -> Self {
        let sites = ["youtube", "instagram", "tiktok", "facebook"]
            .into_iter()
            .map(|id| (id.to_string(), SiteSettings::default()))
            .collect();

        Self {
            global_enabled: true,
            sites,
            delay_after_end: 600,
            random_extra_delay: 200,
            scroll_factor: 0.95,
            retry_attempts: 3,
            safety: SafetySettings::default(),
            hotkeys: HotkeySettings::default(),
        }
    }
}

impl Settings {
    /// Parse a possibly partial JSON document over the defaults.
    pub fn from_json(value: &Value) -> Result<Self> {
        Self::default().merge_json(value)
    }

    /// Deep-merge `patch` over these settings. Objects merge key by key, any
    /// other value replaces what was there.
    pub fn merge_json(&self, patch: &Value) -> Result<Self> {
        let mut merged = serde_json::to_value(self).context("failed to serialize settings")?;
        merge_values(&mut merged, patch);
        let settings: Settings =
            serde_json::from_value(merged).context("settings patch has the wrong shape")?;
        Ok(settings.normalized())
    }

    /// Clamp numeric fields into their supported ranges.
    pub fn normalized(mut self) -> Self {
        let (lo, hi) = SCROLL_FACTOR_RANGE;
        self.scroll_factor = if self.scroll_factor.is_finite() {
            self.scroll_factor.clamp(lo, hi)
        } else {
            Settings::default().scroll_factor
        };
        let (lo, hi) = RETRY_ATTEMPTS_RANGE;
        self.retry_attempts = self.retry_attempts.clamp(lo, hi);
        self
    }

    /// Sites missing from the map count as enabled.
    pub fn site_enabled(&self, site_id: &str) -> bool {
        self.sites
            .get(site_id)
            .map(|site| site.enabled)
            .unwrap_or(true)
    }

    pub fn is_active_for(&self, site_id: &str) -> bool {
        self.global_enabled && self.site_enabled(site_id)
    }
}

fn merge_values(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_values(existing, patch_value),
                    None => {
                        base_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<Value>(&contents) {
                Ok(value) => Settings::from_json(&value).unwrap_or_default(),
                Err(err) => {
                    log::warn!(
                        "Ignoring unreadable settings at {}: {err}",
                        path.display()
                    );
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Store that never touches disk.
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            data: RwLock::new(settings.normalized()),
        }
    }

    pub fn settings(&self) -> Settings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: Settings) -> Result<Settings> {
        let settings = settings.normalized();
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings.clone();
        self.persist(&guard)?;
        Ok(settings)
    }

    /// Merge a partial JSON patch over the current settings and persist.
    pub fn apply_patch(&self, patch: &Value) -> Result<Settings> {
        let merged = self.settings().merge_json(patch)?;
        self.update(merged)
    }

    /// Re-read the backing file, e.g. after another process edited it.
    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let value: Value = serde_json::from_str(&contents)?;
        let data = Settings::from_json(&value)?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_document_merges_over_defaults() {
        let settings = Settings::from_json(&json!({
            "delayAfterEnd": 0,
            "safety": { "stopOnTabInactive": false }
        }))
        .unwrap();

        assert_eq!(settings.delay_after_end, 0);
        assert_eq!(settings.random_extra_delay, 200);
        assert_eq!(settings.retry_attempts, 3);
        assert!(!settings.safety.stop_on_tab_inactive);
        assert!(settings.safety.stop_on_manual_scroll);
        assert!(settings.site_enabled("youtube"));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let settings = Settings::from_json(&json!({
            "scrollFactor": 4.0,
            "retryAttempts": 0
        }))
        .unwrap();
        assert_eq!(settings.scroll_factor, 1.5);
        assert_eq!(settings.retry_attempts, 1);
    }

    #[test]
    fn site_patch_keeps_other_sites() {
        let settings = Settings::default()
            .merge_json(&json!({ "sites": { "tiktok": { "enabled": false } } }))
            .unwrap();
        assert!(!settings.site_enabled("tiktok"));
        assert!(settings.site_enabled("instagram"));
        assert!(settings.site_enabled("some-new-site"));
    }

    #[test]
    fn global_switch_disables_every_site() {
        let settings = Settings::from_json(&json!({ "globalEnabled": false })).unwrap();
        assert!(settings.site_enabled("youtube"));
        assert!(!settings.is_active_for("youtube"));
    }

    #[test]
    fn wrong_shape_is_an_error() {
        assert!(Settings::default()
            .merge_json(&json!({ "retryAttempts": "many" }))
            .is_err());
    }

    #[test]
    fn store_persists_and_reloads() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .apply_patch(&json!({ "retryAttempts": 5, "hotkeys": { "enabled": false } }))
            .unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        let settings = reopened.settings();
        assert_eq!(settings.retry_attempts, 5);
        assert!(!settings.hotkeys.enabled);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.settings(), Settings::default());
    }

    #[test]
    fn reload_picks_up_external_edits() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();
        store.update(Settings::default()).unwrap();

        fs::write(&path, r#"{ "delayAfterEnd": 1200 }"#).unwrap();
        store.reload().unwrap();
        assert_eq!(store.settings().delay_after_end, 1200);

        fs::write(&path, "garbage").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.settings().delay_after_end, 1200);
    }
}
