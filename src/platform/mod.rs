//! Per-site capability providers.
//!
//! Each supported feed is one [`Platform`] variant. Detection runs through
//! [`Platform::detect`], which is the only place that maps a location to a
//! variant.

use url::Url;

use crate::advance::AdvanceMethod;
use crate::detection::{select_active, DetectorConfig};
use crate::host::{FeedHost, NavKey};
use crate::models::CandidateItem;

/// Capability set the controller and orchestrator need from a feed.
pub trait PlatformAdapter: Send + Sync {
    /// Key into `Settings::sites`.
    fn site_id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn matches(&self, url: &Url) -> bool;

    /// Whether this page shows the single-item feed (as opposed to a profile,
    /// search results, etc.).
    fn is_eligible_page(&self, url: &Url) -> bool;

    fn find_active_item(&self, host: &dyn FeedHost) -> Option<CandidateItem>;

    /// Distinct ways to move to the next item, most reliable first.
    fn advance_methods(&self) -> Vec<AdvanceMethod>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    YouTubeShorts,
    InstagramReels,
    TikTok,
    FacebookReels,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::YouTubeShorts,
        Platform::InstagramReels,
        Platform::TikTok,
        Platform::FacebookReels,
    ];

    /// First platform whose host matches `location`, if any.
    pub fn detect(location: &str) -> Option<Platform> {
        let url = Url::parse(location).ok()?;
        Self::ALL.into_iter().find(|platform| platform.matches(&url))
    }

    fn domain(&self) -> &'static str {
        match self {
            Platform::YouTubeShorts => "youtube.com",
            Platform::InstagramReels => "instagram.com",
            Platform::TikTok => "tiktok.com",
            Platform::FacebookReels => "facebook.com",
        }
    }

    pub fn detector_config(&self) -> DetectorConfig {
        match self {
            // Shorts keeps neighbouring players mounted and half-visible
            // while swiping, so it needs a stricter cut-off.
            Platform::YouTubeShorts => DetectorConfig::default().with_threshold(0.5),
            Platform::InstagramReels | Platform::TikTok | Platform::FacebookReels => {
                DetectorConfig::default()
            }
        }
    }
}

impl PlatformAdapter for Platform {
    fn site_id(&self) -> &'static str {
        match self {
            Platform::YouTubeShorts => "youtube",
            Platform::InstagramReels => "instagram",
            Platform::TikTok => "tiktok",
            Platform::FacebookReels => "facebook",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Platform::YouTubeShorts => "YouTube Shorts",
            Platform::InstagramReels => "Instagram Reels",
            Platform::TikTok => "TikTok",
            Platform::FacebookReels => "Facebook Reels",
        }
    }

    fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let domain = self.domain();
        host == domain
            || host
                .strip_suffix(domain)
                .map(|prefix| prefix.ends_with('.'))
                .unwrap_or(false)
    }

    fn is_eligible_page(&self, url: &Url) -> bool {
        if !self.matches(url) {
            return false;
        }
        let path = url.path();
        match self {
            Platform::YouTubeShorts => path.starts_with("/shorts/"),
            Platform::InstagramReels | Platform::FacebookReels => {
                path.starts_with("/reels/") || path.starts_with("/reel/")
            }
            Platform::TikTok => {
                path == "/"
                    || path.starts_with("/foryou")
                    || path.starts_with("/following")
                    || (path.starts_with("/@") && path.contains("/video/"))
            }
        }
    }

    fn find_active_item(&self, host: &dyn FeedHost) -> Option<CandidateItem> {
        let candidates = host.candidates();
        let viewport = host.viewport();
        select_active(&candidates, &viewport, &self.detector_config()).cloned()
    }

    fn advance_methods(&self) -> Vec<AdvanceMethod> {
        use AdvanceMethod::*;
        match self {
            Platform::YouTubeShorts => vec![
                NavigationKey(NavKey::ArrowDown),
                ClickNextControl,
                ScrollContainer,
                ScrollNextIntoView,
            ],
            Platform::InstagramReels => vec![
                ScrollContainer,
                NavigationKey(NavKey::ArrowDown),
                ScrollNextIntoView,
            ],
            Platform::TikTok => vec![
                NavigationKey(NavKey::ArrowDown),
                ClickNextControl,
                ScrollNextIntoView,
                ScrollContainer,
            ],
            Platform::FacebookReels => vec![
                NavigationKey(NavKey::ArrowDown),
                ScrollNextIntoView,
                ScrollContainer,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimulatedFeed;
    use crate::models::{ItemId, Viewport};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn detect_by_host() {
        assert_eq!(
            Platform::detect("https://www.youtube.com/shorts/xyz"),
            Some(Platform::YouTubeShorts)
        );
        assert_eq!(
            Platform::detect("https://m.tiktok.com/foryou"),
            Some(Platform::TikTok)
        );
        assert_eq!(Platform::detect("https://notyoutube.com/shorts/x"), None);
        assert_eq!(Platform::detect("not a url"), None);
    }

    #[test]
    fn eligible_pages() {
        let yt = Platform::YouTubeShorts;
        assert!(yt.is_eligible_page(&url("https://www.youtube.com/shorts/abc")));
        assert!(!yt.is_eligible_page(&url("https://www.youtube.com/watch?v=abc")));

        let ig = Platform::InstagramReels;
        assert!(ig.is_eligible_page(&url("https://www.instagram.com/reels/C1/")));
        assert!(!ig.is_eligible_page(&url("https://www.instagram.com/someone/")));

        let tt = Platform::TikTok;
        assert!(tt.is_eligible_page(&url("https://www.tiktok.com/")));
        assert!(tt.is_eligible_page(&url("https://www.tiktok.com/@a/video/123")));
        assert!(!tt.is_eligible_page(&url("https://www.tiktok.com/@a")));

        let fb = Platform::FacebookReels;
        assert!(fb.is_eligible_page(&url("https://www.facebook.com/reel/99")));
        assert!(!fb.is_eligible_page(&url("https://www.instagram.com/reel/99")));
    }

    #[test]
    fn every_platform_has_distinct_methods() {
        for platform in Platform::ALL {
            let methods = platform.advance_methods();
            assert!(!methods.is_empty());
            for (idx, method) in methods.iter().enumerate() {
                assert!(!methods[idx + 1..].contains(method), "{platform:?}");
            }
        }
    }

    #[test]
    fn site_ids_match_default_settings() {
        let settings = crate::settings::Settings::default();
        for platform in Platform::ALL {
            assert!(settings.sites.contains_key(platform.site_id()));
        }
    }

    #[test]
    fn find_active_item_uses_host_snapshot() {
        let feed = SimulatedFeed::new(
            "https://www.youtube.com/shorts/abc",
            Viewport::new(400.0, 800.0),
            &[5.0, 5.0],
        );
        let active = Platform::YouTubeShorts.find_active_item(&feed);
        assert_eq!(active.map(|item| item.id), Some(ItemId(1)));
    }
}
