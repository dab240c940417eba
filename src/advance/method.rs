use serde::{Deserialize, Serialize};

use crate::host::{HostAction, NavKey};
use crate::models::{ItemId, Viewport};

/// One strategy for moving a feed to its next item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "key")]
pub enum AdvanceMethod {
    /// Synthesise the feed's "next" key.
    NavigationKey(NavKey),
    /// Scroll the feed container by `scrollFactor` viewport heights.
    ScrollContainer,
    /// Bring the item after the current one into view.
    ScrollNextIntoView,
    /// Press the platform's own "next" button.
    ClickNextControl,
}

impl AdvanceMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AdvanceMethod::NavigationKey(NavKey::ArrowDown) => "key_arrow_down",
            AdvanceMethod::NavigationKey(NavKey::PageDown) => "key_page_down",
            AdvanceMethod::ScrollContainer => "scroll_container",
            AdvanceMethod::ScrollNextIntoView => "scroll_next_into_view",
            AdvanceMethod::ClickNextControl => "click_next_control",
        }
    }

    /// The host action for this method, or `None` when it cannot apply
    /// (scrolling "past" an item requires knowing which item that is).
    pub fn to_action(
        &self,
        previous: Option<ItemId>,
        viewport: &Viewport,
        scroll_factor: f64,
    ) -> Option<HostAction> {
        match self {
            AdvanceMethod::NavigationKey(key) => Some(HostAction::DispatchKey { key: *key }),
            AdvanceMethod::ScrollContainer => Some(HostAction::ScrollBy {
                dy: viewport.height * scroll_factor,
            }),
            AdvanceMethod::ScrollNextIntoView => {
                previous.map(|after| HostAction::ScrollIntoView { after })
            }
            AdvanceMethod::ClickNextControl => Some(HostAction::ClickNextControl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_scroll_uses_scroll_factor() {
        let viewport = Viewport::new(400.0, 800.0);
        let action = AdvanceMethod::ScrollContainer.to_action(None, &viewport, 0.5);
        assert_eq!(action, Some(HostAction::ScrollBy { dy: 400.0 }));
    }

    #[test]
    fn scroll_into_view_needs_a_previous_item() {
        let viewport = Viewport::new(400.0, 800.0);
        assert_eq!(
            AdvanceMethod::ScrollNextIntoView.to_action(None, &viewport, 1.0),
            None
        );
        assert_eq!(
            AdvanceMethod::ScrollNextIntoView.to_action(Some(ItemId(3)), &viewport, 1.0),
            Some(HostAction::ScrollIntoView { after: ItemId(3) })
        );
    }
}
