//! Preview Player - the HOME / AT_LOCATION state machine
//!
//! The player owns one hunt and one fresh [`PlayerSession`]. Transitions are
//! synchronous and complete before the next input is handled.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

use crate::model::{non_empty, HomescreenDisplay, HuntBundle, Location, LocationId, ParticipantScoring, Project};
use crate::scoring::{apply_visit, max_score};
use crate::session::PlayerSession;

pub const NO_CLUE_HOME: &str = "No clue provided";
pub const NO_CLUE_LOCATION: &str = "No clue provided.";
pub const UNNAMED_LOCATION: &str = "Unnamed Location";
pub const UNTITLED_PROJECT: &str = "Untitled Project";
pub const NO_INSTRUCTIONS: &str = "No instructions provided.";
pub const NO_LOCATIONS: &str = "No locations found for this project.";

/// Which screen the player is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "location_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Home,
    AtLocation(LocationId),
}

/// Result of a selection, so callers can decide on an "already visited" cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SelectOutcome {
    FirstVisit { awarded: u32 },
    Revisit,
    /// The id is not part of this project; the player is back home.
    Stale,
}

/// Rich location content rendered verbatim.
///
/// The authoring layer sanitizes this before it is stored; the player does
/// not re-sanitize it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrustedHtml<'a>(pub &'a str);

/// A location's clue as listed on the home screen; displays as `name - clue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationClue<'a> {
    pub name: &'a str,
    pub clue: &'a str,
}

impl fmt::Display for LocationClue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.clue)
    }
}

/// Body of the home screen, chosen by the project's homescreen display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HomeContent<'a> {
    InitialClue { heading: &'static str, clue: &'a str },
    AllLocations { heading: &'static str, locations: Vec<LocationClue<'a>> },
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationView<'a> {
    pub heading: String,
    pub clue: &'a str,
    pub content: TrustedHtml<'a>,
}

/// Everything below the header for the current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen<'a> {
    Home(HomeContent<'a>),
    Location(LocationView<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenHeader<'a> {
    pub title: &'a str,
    pub instructions: &'a str,
}

/// Score and visit counters for the progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub total_score: u64,
    pub max_score: u64,
    pub visited: usize,
    pub location_count: usize,
}

impl Progress {
    /// `Score: <total>/<max>`, as shown under the header.
    pub fn score_line(&self) -> String {
        format!("Score: {}/{}", self.total_score, self.max_score)
    }

    /// `Locations Visited: <n>/<count>`.
    pub fn visited_line(&self) -> String {
        format!("Locations Visited: {}/{}", self.visited, self.location_count)
    }
}

/// One entry of the location picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationOption<'a> {
    pub value: String,
    pub label: &'a str,
}

/// Wording of the "go to location" action.
pub fn action_label(scoring: ParticipantScoring) -> &'static str {
    match scoring {
        ParticipantScoring::ScanCount => "Scan QR Code at Location:",
        ParticipantScoring::NotScored | ParticipantScoring::VisitCount => "Go to Location:",
    }
}

/// Home screen content for a project; depends only on its display mode.
pub fn home_content<'a>(project: &'a Project, locations: &'a [Location]) -> HomeContent<'a> {
    match project.homescreen_display {
        HomescreenDisplay::InitialClue => HomeContent::InitialClue {
            heading: "Initial Clue",
            clue: project.initial_clue.as_deref().unwrap_or_default(),
        },
        HomescreenDisplay::AllLocations => HomeContent::AllLocations {
            heading: "All Locations",
            locations: locations
                .iter()
                .map(|l| LocationClue {
                    name: l.location_name.as_deref().unwrap_or_default(),
                    clue: l.clue_text().unwrap_or(NO_CLUE_HOME),
                })
                .collect(),
        },
        HomescreenDisplay::Blank => HomeContent::Empty,
    }
}

/// Location screen content with name and clue fallbacks.
pub fn location_view(location: &Location) -> LocationView<'_> {
    LocationView {
        heading: format!("Location: {}", location.name().unwrap_or(UNNAMED_LOCATION)),
        clue: location.clue_text().unwrap_or(NO_CLUE_LOCATION),
        content: TrustedHtml(location.location_content.as_deref().unwrap_or_default()),
    }
}

/// One preview run over a single hunt.
pub struct PreviewPlayer {
    hunt: HuntBundle,
    max_score: u64,
    session: PlayerSession,
}

impl PreviewPlayer {
    /// Start a preview. Locations that belong to another project, or repeat
    /// an id already seen, are dropped so every selectable id is this
    /// project's own.
    pub fn new(hunt: HuntBundle) -> Self {
        let HuntBundle { project, locations } = hunt;
        let mut seen = HashSet::new();
        let locations: Vec<Location> = locations
            .into_iter()
            .filter(|l| {
                if l.project_id != project.id {
                    warn!(location_id = l.id, project_id = project.id, "dropping location from another project");
                    return false;
                }
                if !seen.insert(l.id) {
                    warn!(location_id = l.id, "dropping duplicate location id");
                    return false;
                }
                true
            })
            .collect();

        let max_score = max_score(&locations);
        debug!(project_id = project.id, locations = locations.len(), max_score, "preview session started");

        Self {
            hunt: HuntBundle { project, locations },
            max_score,
            session: PlayerSession::new(),
        }
    }

    /// The project being previewed.
    pub fn project(&self) -> &Project {
        &self.hunt.project
    }

    /// Selectable locations in project order.
    pub fn locations(&self) -> &[Location] {
        &self.hunt.locations
    }

    /// Visited set, score and current selection.
    pub fn session(&self) -> &PlayerSession {
        &self.session
    }

    /// `Home` until a location is selected.
    pub fn state(&self) -> PlayerState {
        match self.session.selected_location_id() {
            Some(id) => PlayerState::AtLocation(id),
            None => PlayerState::Home,
        }
    }

    /// The location currently on screen.
    pub fn selected_location(&self) -> Option<&Location> {
        self.session
            .selected_location_id()
            .and_then(|id| self.hunt.location(id))
    }

    /// Go to a location, scoring it on the first visit only.
    ///
    /// An id outside this project leaves the player at home.
    pub fn select_location(&mut self, id: LocationId) -> SelectOutcome {
        let Some(location) = self.hunt.location(id) else {
            warn!(location_id = id, project_id = self.hunt.project.id, "selected location is not part of this project");
            self.session.clear_selection();
            return SelectOutcome::Stale;
        };

        let outcome = if self.session.has_visited(id) {
            SelectOutcome::Revisit
        } else {
            self.session = apply_visit(&self.session, location);
            SelectOutcome::FirstVisit {
                awarded: location.points(),
            }
        };
        self.session.select(id);

        debug!(location_id = id, ?outcome, total_score = self.session.total_score(), "location selected");
        outcome
    }

    /// Back to the home screen; visits and score are kept.
    pub fn return_home(&mut self) {
        self.session.clear_selection();
    }

    /// Content for the current state.
    pub fn screen(&self) -> Screen<'_> {
        match self.selected_location() {
            Some(location) => Screen::Location(location_view(location)),
            None => Screen::Home(home_content(&self.hunt.project, &self.hunt.locations)),
        }
    }

    /// Project title and instructions, with fallbacks.
    pub fn header(&self) -> ScreenHeader<'_> {
        let project = &self.hunt.project;
        ScreenHeader {
            title: non_empty(project.title.as_deref()).unwrap_or(UNTITLED_PROJECT),
            instructions: non_empty(project.instructions.as_deref()).unwrap_or(NO_INSTRUCTIONS),
        }
    }

    /// Picker label for this project's scoring mode.
    pub fn action_label(&self) -> &'static str {
        action_label(self.hunt.project.participant_scoring)
    }

    /// Picker entries in project order, or `None` when the project has no
    /// locations and [`NO_LOCATIONS`] should be shown instead.
    pub fn location_options(&self) -> Option<Vec<LocationOption<'_>>> {
        if self.hunt.locations.is_empty() {
            return None;
        }
        Some(
            self.hunt
                .locations
                .iter()
                .map(|l| LocationOption {
                    value: l.id.to_string(),
                    label: l.location_name.as_deref().unwrap_or_default(),
                })
                .collect(),
        )
    }

    /// Highest reachable score, computed once when the preview starts.
    pub fn max_score(&self) -> u64 {
        self.max_score
    }

    /// Score and visit counts against their maximums.
    pub fn progress(&self) -> Progress {
        Progress {
            total_score: self.session.total_score(),
            max_score: self.max_score,
            visited: self.session.visited_count(),
            location_count: self.hunt.locations.len(),
        }
    }
}
