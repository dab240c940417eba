use crate::detection::config::DetectorConfig;
use crate::models::{CandidateItem, PlaybackState, Viewport};

/// Compute the activity score of one candidate using a 4-factor weighted sum.
///
/// Returns 0.0 for items that are too small or entirely off-screen so they
/// can never be selected.
pub fn activity_score(item: &CandidateItem, viewport: &Viewport, config: &DetectorConfig) -> f64 {
    if item.rect.width < config.min_width || item.rect.height < config.min_height {
        return 0.0;
    }

    let visible = score_visibility(item, viewport);
    if visible <= 0.0 {
        return 0.0;
    }

    let score = config.weight_visibility * visible
        + config.weight_playing * score_playing(item, config)
        + config.weight_centering * score_centering(item, viewport)
        + config.weight_duration * score_duration(item);

    score.clamp(0.0, 1.0)
}

/// Pick the candidate the user is most likely watching.
///
/// Ties keep the first candidate encountered. Returns `None` when no score
/// reaches the acceptance threshold; callers must not fall back to a guess.
pub fn select_active<'a>(
    candidates: &'a [CandidateItem],
    viewport: &Viewport,
    config: &DetectorConfig,
) -> Option<&'a CandidateItem> {
    let mut best: Option<(&CandidateItem, f64)> = None;

    for candidate in candidates {
        let score = activity_score(candidate, viewport, config);
        if score <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    best.filter(|(_, score)| *score >= config.acceptance_threshold)
        .map(|(item, _)| item)
}

/// Visible fraction of the item's own area.
fn score_visibility(item: &CandidateItem, viewport: &Viewport) -> f64 {
    let area = item.rect.area();
    if area <= 0.0 {
        return 0.0;
    }
    (item.rect.intersection_area(&viewport.rect()) / area).min(1.0)
}

fn score_playing(item: &CandidateItem, config: &DetectorConfig) -> f64 {
    if item.state == PlaybackState::Playing && item.ready_state >= config.min_ready_state {
        1.0
    } else {
        0.0
    }
}

/// 1.0 at the viewport's vertical center, falling linearly to 0.0 half a
/// viewport away.
fn score_centering(item: &CandidateItem, viewport: &Viewport) -> f64 {
    let half = viewport.height / 2.0;
    if half <= 0.0 {
        return 0.0;
    }
    let distance = (item.rect.center_y() - viewport.center_y()).abs();
    (1.0 - distance / half).max(0.0)
}

fn score_duration(item: &CandidateItem) -> f64 {
    if item.known_duration().is_some() {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, Rect};

    fn viewport() -> Viewport {
        Viewport::new(400.0, 800.0)
    }

    fn item(id: u64, y: f64, state: PlaybackState) -> CandidateItem {
        CandidateItem {
            id: ItemId(id),
            rect: Rect::new(0.0, y, 400.0, 800.0),
            state,
            ready_state: 4,
            duration: Some(15.0),
            position: 0.0,
        }
    }

    #[test]
    fn centered_playing_item_scores_full() {
        let score = activity_score(
            &item(1, 0.0, PlaybackState::Playing),
            &viewport(),
            &DetectorConfig::default(),
        );
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tiny_and_offscreen_items_score_zero() {
        let config = DetectorConfig::default();
        let mut thumb = item(1, 0.0, PlaybackState::Playing);
        thumb.rect = Rect::new(0.0, 0.0, 40.0, 40.0);
        assert_eq!(activity_score(&thumb, &viewport(), &config), 0.0);

        let below = item(2, 800.0, PlaybackState::Playing);
        assert_eq!(activity_score(&below, &viewport(), &config), 0.0);
    }

    #[test]
    fn playing_item_beats_paused_neighbour_in_view() {
        let candidates = vec![
            item(1, -300.0, PlaybackState::Paused),
            item(2, 500.0, PlaybackState::Playing),
        ];
        let active = select_active(&candidates, &viewport(), &DetectorConfig::default());
        assert_eq!(active.map(|c| c.id), Some(ItemId(2)));
    }

    #[test]
    fn playing_bonus_requires_readiness() {
        let config = DetectorConfig::default();
        let mut buffering = item(1, 0.0, PlaybackState::Playing);
        buffering.ready_state = 1;
        let ready = item(2, 0.0, PlaybackState::Playing);
        assert!(
            activity_score(&buffering, &viewport(), &config)
                < activity_score(&ready, &viewport(), &config)
        );
    }

    #[test]
    fn ties_keep_first_candidate() {
        let candidates = vec![
            item(7, 0.0, PlaybackState::Playing),
            item(8, 0.0, PlaybackState::Playing),
        ];
        let active = select_active(&candidates, &viewport(), &DetectorConfig::default());
        assert_eq!(active.map(|c| c.id), Some(ItemId(7)));
    }

    #[test]
    fn weak_best_candidate_yields_none() {
        // Mostly off-screen, paused, no duration: well below 0.5.
        let mut sliver = item(1, 700.0, PlaybackState::Paused);
        sliver.duration = None;
        let candidates = vec![sliver];
        let config = DetectorConfig::default().with_threshold(0.5);
        assert!(select_active(&candidates, &viewport(), &config).is_none());
    }

    #[test]
    fn selection_is_a_stable_member_of_the_input() {
        let candidates = vec![
            item(1, -600.0, PlaybackState::Paused),
            item(2, 200.0, PlaybackState::Playing),
            item(3, 1000.0, PlaybackState::Paused),
        ];
        let config = DetectorConfig::default();
        let first = select_active(&candidates, &viewport(), &config).map(|c| c.id);
        let second = select_active(&candidates, &viewport(), &config).map(|c| c.id);
        assert_eq!(first, second);
        let id = first.expect("an item should be selected");
        assert!(candidates.iter().any(|c| c.id == id));
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(select_active(&[], &viewport(), &DetectorConfig::default()).is_none());
    }
}
