//! Hunt Data Model - Projects and their Locations
//!
//! These records arrive already fetched from the authoring backend. Tag
//! fields are closed enums; unknown or empty tags fall back to a neutral
//! variant instead of failing the whole load.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub type ProjectId = u64;
pub type LocationId = u64;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read hunt file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid hunt JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// How participants are scored. Only affects the wording of the
/// "go to location" action, never the score itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum ParticipantScoring {
    #[default]
    NotScored,
    ScanCount,
    VisitCount,
}

impl From<Option<String>> for ParticipantScoring {
    fn from(tag: Option<String>) -> Self {
        match tag.as_deref() {
            Some("Number of Scanned QR Codes") => Self::ScanCount,
            Some("Number of Locations Entered") => Self::VisitCount,
            _ => Self::NotScored,
        }
    }
}

impl From<ParticipantScoring> for String {
    fn from(scoring: ParticipantScoring) -> Self {
        match scoring {
            ParticipantScoring::NotScored => "Not Scored",
            ParticipantScoring::ScanCount => "Number of Scanned QR Codes",
            ParticipantScoring::VisitCount => "Number of Locations Entered",
        }
        .to_string()
    }
}

/// What the player's home screen shows while no location is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum HomescreenDisplay {
    InitialClue,
    AllLocations,
    /// Unset or unrecognised; the home screen stays empty.
    #[default]
    Blank,
}

impl From<Option<String>> for HomescreenDisplay {
    fn from(tag: Option<String>) -> Self {
        match tag.as_deref() {
            Some("display_initial_clue") => Self::InitialClue,
            Some("display_all_locations") => Self::AllLocations,
            _ => Self::Blank,
        }
    }
}

impl From<HomescreenDisplay> for String {
    fn from(display: HomescreenDisplay) -> Self {
        match display {
            HomescreenDisplay::InitialClue => "display_initial_clue",
            HomescreenDisplay::AllLocations => "display_all_locations",
            HomescreenDisplay::Blank => "",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum LocationTrigger {
    Entry,
    Scan,
    Both,
    #[default]
    Unspecified,
}

impl From<Option<String>> for LocationTrigger {
    fn from(tag: Option<String>) -> Self {
        match tag.as_deref() {
            Some("Location Entry") => Self::Entry,
            Some("QR Code Scan") => Self::Scan,
            Some("Both Location Entry and QR Code Scan") => Self::Both,
            _ => Self::Unspecified,
        }
    }
}

impl From<LocationTrigger> for String {
    fn from(trigger: LocationTrigger) -> Self {
        match trigger {
            LocationTrigger::Entry => "Location Entry",
            LocationTrigger::Scan => "QR Code Scan",
            LocationTrigger::Both => "Both Location Entry and QR Code Scan",
            LocationTrigger::Unspecified => "",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub initial_clue: Option<String>,
    #[serde(default)]
    pub participant_scoring: ParticipantScoring,
    #[serde(default)]
    pub homescreen_display: HomescreenDisplay,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub location_trigger: LocationTrigger,
    #[serde(default)]
    pub location_position: Option<String>,
    #[serde(default)]
    pub score_points: Option<u32>,
    #[serde(default)]
    pub clue: Option<String>,
    /// Rich formatted content, sanitized by the authoring layer.
    #[serde(default)]
    pub location_content: Option<String>,
}

impl Location {
    /// Points awarded on first visit; a missing value is worth nothing.
    pub fn points(&self) -> u32 {
        self.score_points.unwrap_or(0)
    }

    pub fn name(&self) -> Option<&str> {
        non_empty(self.location_name.as_deref())
    }

    pub fn clue_text(&self) -> Option<&str> {
        non_empty(self.clue.as_deref())
    }
}

/// A project together with its locations in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuntBundle {
    pub project: Project,
    #[serde(default)]
    pub locations: Vec<Location>,
}

impl HuntBundle {
    pub fn new(project: Project, locations: Vec<Location>) -> Self {
        Self { project, locations }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Locations that belong to this bundle's project, in stored order.
    pub fn owned_locations(&self) -> impl Iterator<Item = &Location> {
        let project_id = self.project.id;
        self.locations.iter().filter(move |l| l.project_id == project_id)
    }

    /// Like [`HuntBundle::location`], but ignores rows from another project.
    pub fn owned_location(&self, id: LocationId) -> Option<&Location> {
        self.owned_locations().find(|l| l.id == id)
    }
}

/// Empty strings count as absent, the same as `null`.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
