//! Player Session - ephemeral per-preview state
//!
//! A session is created fresh for each preview and dropped with it. The
//! visited set only grows, and the total score is always the sum of the
//! points of the visited locations.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::model::LocationId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerSession {
    selected_location_id: Option<LocationId>,
    visited_location_ids: BTreeSet<LocationId>,
    total_score: u64,
}

impl PlayerSession {
    /// A fresh session: home screen, nothing visited, score 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The location on screen, or `None` while at home.
    pub fn selected_location_id(&self) -> Option<LocationId> {
        self.selected_location_id
    }

    /// Every location visited so far; never shrinks.
    pub fn visited_location_ids(&self) -> &BTreeSet<LocationId> {
        &self.visited_location_ids
    }

    /// Sum of the points of every visited location.
    pub fn total_score(&self) -> u64 {
        self.total_score
    }

    /// Whether `id` has already been scored.
    pub fn has_visited(&self, id: LocationId) -> bool {
        self.visited_location_ids.contains(&id)
    }

    pub fn visited_count(&self) -> usize {
        self.visited_location_ids.len()
    }

    /// Only the scoring engine records visits.
    pub(crate) fn with_visit(&self, id: LocationId, points: u32) -> Self {
        let mut next = self.clone();
        if next.visited_location_ids.insert(id) {
            next.total_score += u64::from(points);
        }
        next
    }

    pub(crate) fn select(&mut self, id: LocationId) {
        self.selected_location_id = Some(id);
    }

    pub(crate) fn clear_selection(&mut self) {
        self.selected_location_id = None;
    }
}
