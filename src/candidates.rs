use serde::{Deserialize, Serialize};

use crate::location::{Level, Location};

pub const CUSTOM_OPTION: &str = "Other (Custom)";
pub const EMPTY_HINT: &str = "No results, use Other (Custom)";
pub const EMPTY_COUNTRY_HINT: &str = "No countries found";
const UNKNOWN_CONTEXT: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateKind {
    Database,
    Custom,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub parent_context: String,
    pub kind: CandidateKind,
}

impl Candidate {
    pub fn database(level: Level, index: usize, name: impl Into<String>, context: &str) -> Self {
        Self {
            id: format!("{}-{index}", level.as_str()),
            name: name.into(),
            parent_context: context.to_string(),
            kind: CandidateKind::Database,
        }
    }

    pub fn current(level: Level, name: impl Into<String>, context: &str) -> Self {
        Self {
            id: format!("current-{}", level.as_str()),
            name: name.into(),
            parent_context: context.to_string(),
            kind: CandidateKind::Current,
        }
    }

    pub fn custom_option(level: Level, context: &str) -> Self {
        Self {
            id: format!("custom-{}", level.as_str()),
            name: CUSTOM_OPTION.to_string(),
            parent_context: context.to_string(),
            kind: CandidateKind::Custom,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            parent_context: String::new(),
            kind: CandidateKind::Database,
        }
    }

    pub fn is_custom_option(&self) -> bool {
        self.kind == CandidateKind::Custom || self.name == CUSTOM_OPTION
    }

    pub fn badge(&self, level: Level) -> String {
        match self.kind {
            CandidateKind::Database => "Database".to_string(),
            CandidateKind::Custom => "Custom".to_string(),
            CandidateKind::Current => format!("Current {}", level.display_name()),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.name.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateList {
    level: Level,
    entries: Vec<Candidate>,
}

impl CandidateList {
    /// Region, city and town lists always end with the custom sentinel, and
    /// keep a selected value that the lookup did not return visible at the
    /// top. The country list carries neither synthetic entry.
    pub fn build(level: Level, fetched: &[String], location: &Location, term: &str) -> Self {
        let context = parent_context(level, location);
        let needle = term.trim().to_lowercase();
        let current = location.get(level);

        let mut entries = Vec::with_capacity(fetched.len() + 2);
        if level.accepts_custom()
            && !current.is_empty()
            && !fetched.iter().any(|name| name == current)
        {
            entries.push(Candidate::current(level, current, &context));
        }
        entries.extend(
            fetched
                .iter()
                .enumerate()
                .map(|(index, name)| Candidate::database(level, index, name.as_str(), &context)),
        );
        entries.retain(|candidate| candidate.matches(&needle));
        if level.accepts_custom() {
            entries.push(Candidate::custom_option(level, &context));
        }

        Self { level, entries }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn entries(&self) -> &[Candidate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Candidate> {
        self.entries.iter().find(|c| c.name == name)
    }

    pub fn has_matches(&self) -> bool {
        self.entries.iter().any(|c| !c.is_custom_option())
    }

    pub fn empty_hint(&self) -> Option<&'static str> {
        if self.has_matches() {
            None
        } else if self.level.accepts_custom() {
            Some(EMPTY_HINT)
        } else {
            Some(EMPTY_COUNTRY_HINT)
        }
    }
}

fn parent_context(level: Level, location: &Location) -> String {
    let mut parts = Vec::new();
    let mut cursor = level.parent();
    while let Some(parent) = cursor {
        let value = location.get(parent).trim();
        if !value.is_empty() {
            parts.push(value);
        }
        cursor = parent.parent();
    }
    if parts.is_empty() {
        if level == Level::Country {
            String::new()
        } else {
            UNKNOWN_CONTEXT.to_string()
        }
    } else {
        parts.join(", ")
    }
}
