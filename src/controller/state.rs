use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::platform::{Platform, PlatformAdapter};

/// One page context the controller may track. A fresh id is minted whenever
/// the context is (re)entered so late results from an earlier context can be
/// told apart.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingContext {
    pub id: Uuid,
    pub platform: Platform,
    pub location: String,
}

impl TrackingContext {
    pub fn new(platform: Platform, location: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform,
            location,
        }
    }

    pub fn renewed(&self) -> Self {
        Self::new(self.platform, self.location.clone())
    }

    pub fn is_eligible_page(&self) -> bool {
        eligible(self.platform, &self.location)
    }

    /// Whether `location` is still this context: same platform, and a feed
    /// page exactly when this one is. Feeds rewrite the URL for every item
    /// they show, so most location changes land here.
    pub fn is_same_feed(&self, location: &str) -> bool {
        Platform::detect(location) == Some(self.platform)
            && eligible(self.platform, location) == self.is_eligible_page()
    }
}

fn eligible(platform: Platform, location: &str) -> bool {
    Url::parse(location)
        .map(|url| platform.is_eligible_page(&url))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ControllerStatusKind {
    Unattached,
    Attached,
    Tracking,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ControllerStatus {
    /// No supported platform at the current location.
    #[default]
    Unattached,
    /// Platform matched; waiting for the initial settle, or the page is not
    /// a feed page, or the site is disabled.
    Attached(TrackingContext),
    /// Watching the feed and advancing it.
    Tracking(TrackingContext),
}

impl ControllerStatus {
    pub fn kind(&self) -> ControllerStatusKind {
        match self {
            ControllerStatus::Unattached => ControllerStatusKind::Unattached,
            ControllerStatus::Attached(_) => ControllerStatusKind::Attached,
            ControllerStatus::Tracking(_) => ControllerStatusKind::Tracking,
        }
    }

    pub fn context(&self) -> Option<&TrackingContext> {
        match self {
            ControllerStatus::Unattached => None,
            ControllerStatus::Attached(ctx) | ControllerStatus::Tracking(ctx) => Some(ctx),
        }
    }

    pub fn context_mut(&mut self) -> Option<&mut TrackingContext> {
        match self {
            ControllerStatus::Unattached => None,
            ControllerStatus::Attached(ctx) | ControllerStatus::Tracking(ctx) => Some(ctx),
        }
    }

    pub fn tracking(&self) -> Option<&TrackingContext> {
        match self {
            ControllerStatus::Tracking(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn is_tracking_context(&self, id: Uuid) -> bool {
        self.tracking().map(|ctx| ctx.id == id).unwrap_or(false)
    }
}
