//! Hunt Validation - checks on the upstream data contract
//!
//! Rules produce structured violations; any Error-severity violation makes
//! the hunt invalid. Warnings and infos are reported but never block.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::{HomescreenDisplay, HuntBundle};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    #[serde(default)]
    pub location_id: Option<u64>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub project_id: u64,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn by_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a ValidationViolation> + 'a {
        self.violations.iter().filter(move |v| v.rule == rule)
    }
}

pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, hunt: &HuntBundle) -> Vec<ValidationViolation>;

    fn violation(&self, severity: ViolationSeverity, message: String, location_id: Option<u64>, remediation: &str) -> ValidationViolation {
        ValidationViolation {
            rule: self.name().to_string(),
            severity,
            message,
            location_id,
            remediation: vec![remediation.to_string()],
        }
    }
}

pub struct DuplicateLocationRule;

impl ValidationRule for DuplicateLocationRule {
    fn name(&self) -> &'static str { "duplicate_location_id" }

    fn validate(&self, hunt: &HuntBundle) -> Vec<ValidationViolation> {
        let mut seen = HashSet::new();
        hunt.locations
            .iter()
            .filter(|l| !seen.insert(l.id))
            .map(|l| self.violation(
                ViolationSeverity::Error,
                format!("Location id {} appears more than once", l.id),
                Some(l.id),
                "Remove or renumber the duplicate location",
            ))
            .collect()
    }
}

pub struct ForeignLocationRule;

impl ValidationRule for ForeignLocationRule {
    fn name(&self) -> &'static str { "foreign_location" }

    fn validate(&self, hunt: &HuntBundle) -> Vec<ValidationViolation> {
        hunt.locations
            .iter()
            .filter(|l| l.project_id != hunt.project.id)
            .map(|l| self.violation(
                ViolationSeverity::Error,
                format!("Location {} belongs to project {}, not {}", l.id, l.project_id, hunt.project.id),
                Some(l.id),
                "Fetch locations filtered by this project id",
            ))
            .collect()
    }
}

pub struct UnnamedLocationRule;

impl ValidationRule for UnnamedLocationRule {
    fn name(&self) -> &'static str { "unnamed_location" }

    fn validate(&self, hunt: &HuntBundle) -> Vec<ValidationViolation> {
        hunt.locations
            .iter()
            .filter(|l| l.name().is_none())
            .map(|l| self.violation(
                ViolationSeverity::Warning,
                format!("Location {} has no name", l.id),
                Some(l.id),
                "Give the location a name players will recognise",
            ))
            .collect()
    }
}

pub struct MissingClueRule;

impl ValidationRule for MissingClueRule {
    fn name(&self) -> &'static str { "missing_clue" }

    fn validate(&self, hunt: &HuntBundle) -> Vec<ValidationViolation> {
        hunt.locations
            .iter()
            .filter(|l| l.clue_text().is_none())
            .map(|l| self.violation(
                ViolationSeverity::Info,
                format!("Location {} has no clue", l.id),
                Some(l.id),
                "Add a clue leading players to this location",
            ))
            .collect()
    }
}

pub struct HomescreenUnsetRule;

impl ValidationRule for HomescreenUnsetRule {
    fn name(&self) -> &'static str { "homescreen_unset" }

    fn validate(&self, hunt: &HuntBundle) -> Vec<ValidationViolation> {
        if hunt.project.homescreen_display != HomescreenDisplay::Blank {
            return vec![];
        }
        vec![self.violation(
            ViolationSeverity::Warning,
            "Home screen display is not set; players will see an empty home screen".to_string(),
            None,
            "Choose display_initial_clue or display_all_locations",
        )]
    }
}

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(DuplicateLocationRule),
                Box::new(ForeignLocationRule),
                Box::new(UnnamedLocationRule),
                Box::new(MissingClueRule),
                Box::new(HomescreenUnsetRule),
            ],
        }
    }

    pub fn validate(&self, hunt: &HuntBundle) -> ValidationResult {
        let violations: Vec<_> = self.rules.iter().flat_map(|rule| rule.validate(hunt)).collect();
        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);

        ValidationResult {
            valid,
            project_id: hunt.project.id,
            violations,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_bundle(hunt: &HuntBundle) -> ValidationResult {
    Validator::new().validate(hunt)
}
