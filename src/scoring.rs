//! Scoring Engine - pure score derivations

use crate::model::Location;
use crate::session::PlayerSession;

/// Highest score a player can reach in a project. Missing points count as 0.
///
/// Summed as `u64`, so any mix of `u32` point values fits.
pub fn max_score(locations: &[Location]) -> u64 {
    locations.iter().map(|l| u64::from(l.points())).sum()
}

/// Record a visit. Re-visiting a location returns the session unchanged.
pub fn apply_visit(session: &PlayerSession, location: &Location) -> PlayerSession {
    if session.has_visited(location.id) {
        return session.clone();
    }
    session.with_visit(location.id, location.points())
}

/// Sum of the points of every visited location, recomputed from scratch.
pub fn score_of_visited(session: &PlayerSession, locations: &[Location]) -> u64 {
    locations
        .iter()
        .filter(|l| session.has_visited(l.id))
        .map(|l| u64::from(l.points()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocationTrigger;

    fn location(id: u64, points: Option<u32>) -> Location {
        Location {
            id,
            project_id: 1,
            location_name: Some(format!("Spot {id}")),
            location_trigger: LocationTrigger::Entry,
            location_position: None,
            score_points: points,
            clue: None,
            location_content: None,
        }
    }

    #[test]
    fn test_max_score_sums_points() {
        let locations = vec![location(1, Some(10)), location(2, None), location(3, Some(5))];
        assert_eq!(max_score(&locations), 15);
    }

    #[test]
    fn test_max_score_empty_is_zero() {
        assert_eq!(max_score(&[]), 0);
    }

    #[test]
    fn test_apply_visit_awards_once() {
        let a = location(1, Some(10));
        let session = apply_visit(&PlayerSession::new(), &a);
        assert_eq!(session.total_score(), 10);

        let again = apply_visit(&session, &a);
        assert_eq!(again, session);
    }

    #[test]
    fn test_apply_visit_null_points() {
        let session = apply_visit(&PlayerSession::new(), &location(4, None));
        assert!(session.has_visited(4));
        assert_eq!(session.total_score(), 0);
    }

    #[test]
    fn test_total_matches_recomputation() {
        let locations = vec![location(1, Some(3)), location(2, Some(4)), location(3, Some(8))];
        let mut session = PlayerSession::new();
        for id in [3, 1, 3, 2, 1] {
            let loc = locations.iter().find(|l| l.id == id).unwrap();
            session = apply_visit(&session, loc);
            assert_eq!(session.total_score(), score_of_visited(&session, &locations));
        }
        assert_eq!(session.total_score(), 15);
    }

    #[test]
    fn test_scores_past_u32_range() {
        let locations = vec![location(1, Some(u32::MAX)), location(2, Some(1))];
        assert_eq!(max_score(&locations), u64::from(u32::MAX) + 1);

        let session = apply_visit(&PlayerSession::new(), &locations[0]);
        let session = apply_visit(&session, &locations[1]);
        assert_eq!(session.total_score(), u64::from(u32::MAX) + 1);
        assert_eq!(session.total_score(), score_of_visited(&session, &locations));
    }
}
