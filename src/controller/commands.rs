//! Request/response protocol spoken by the external UI.
//!
//! Requests arrive as JSON objects tagged by `action`; responses use the
//! field names the UI already reads (`scrollCount`, `lastVideoInfo`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ItemId, VideoInfo};
use crate::platform::PlatformAdapter;
use crate::settings::Settings;

use super::runner::{AdvanceTrigger, Controller, Reply};
use super::state::ControllerStatusKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "action")]
pub enum ControlRequest {
    GetState,
    /// Run one advance immediately.
    TestScroll,
    ResetStats,
    TogglePause,
    GetSettings,
    /// Merge a partial settings document and apply it live.
    UpdateSettings { patch: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub site_name: Option<String>,
    pub is_supported: bool,
    pub is_site_enabled: bool,
    pub is_running: bool,
    pub paused: bool,
    pub scroll_count: u64,
    pub last_scroll_timestamp: Option<DateTime<Utc>>,
    pub last_video_info: Option<VideoInfo>,
    pub last_error: Option<String>,
    pub status: ControllerStatusKind,
    pub attached_item: Option<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScrollResult {
    pub success: bool,
    pub scroll_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessResult {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PauseResult {
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControlResponse {
    State(StateSnapshot),
    TestScroll(TestScrollResult),
    Success(SuccessResult),
    Paused(PauseResult),
    Settings(Settings),
}

impl Controller {
    pub(super) fn handle_control(&mut self, request: ControlRequest, reply: Reply) {
        let response = match request {
            ControlRequest::TestScroll => {
                // Answered once the advance run reports back.
                self.manual_advance(AdvanceTrigger::Manual, Some(reply));
                return;
            }
            ControlRequest::GetState => Ok(ControlResponse::State(self.state_snapshot())),
            ControlRequest::ResetStats => self
                .stats
                .reset()
                .map(|_| ControlResponse::Success(SuccessResult { success: true }))
                .map_err(|e| e.to_string()),
            ControlRequest::TogglePause => Ok(ControlResponse::Paused(PauseResult {
                paused: self.toggle_pause(),
            })),
            ControlRequest::GetSettings => Ok(ControlResponse::Settings(self.settings.settings())),
            ControlRequest::UpdateSettings { patch } => match self.settings.apply_patch(&patch) {
                Ok(settings) => {
                    self.refresh_enablement();
                    Ok(ControlResponse::Settings(settings))
                }
                Err(e) => Err(format!("{e:#}")),
            },
        };
        let _ = reply.send(response);
    }

    pub(super) fn state_snapshot(&self) -> StateSnapshot {
        let counters = self.stats.counters();
        let settings = self.settings.settings();
        let context = self.status.context();

        StateSnapshot {
            site_name: context.map(|ctx| ctx.platform.display_name().to_string()),
            is_supported: context.map(|ctx| ctx.is_eligible_page()).unwrap_or(false),
            is_site_enabled: context
                .map(|ctx| settings.is_active_for(ctx.platform.site_id()))
                .unwrap_or(false),
            is_running: self.status.tracking().is_some(),
            paused: self.paused,
            scroll_count: counters.scroll_count,
            last_scroll_timestamp: counters.last_scroll_timestamp,
            last_video_info: self.last_video,
            last_error: self.last_error.clone(),
            status: self.status.kind(),
            attached_item: self.session.item(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_parse_from_action_tags() {
        let request: ControlRequest = serde_json::from_value(json!({ "action": "getState" })).unwrap();
        assert_eq!(request, ControlRequest::GetState);

        let request: ControlRequest = serde_json::from_value(json!({
            "action": "updateSettings",
            "patch": { "retryAttempts": 2 }
        }))
        .unwrap();
        assert_eq!(
            request,
            ControlRequest::UpdateSettings {
                patch: json!({ "retryAttempts": 2 })
            }
        );

        assert!(serde_json::from_value::<ControlRequest>(json!({ "action": "selfDestruct" })).is_err());
    }

    #[test]
    fn responses_serialize_flat() {
        let response = ControlResponse::TestScroll(TestScrollResult {
            success: true,
            scroll_count: 4,
        });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "success": true, "scrollCount": 4 })
        );

        let response = ControlResponse::Paused(PauseResult { paused: true });
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "paused": true }));
    }
}
