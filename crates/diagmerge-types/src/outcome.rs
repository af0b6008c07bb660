//! Merge outcomes and the per-run summary.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Model subsystem whose store a code lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subsystem {
    Atmosphere,
    Ocean,
    Ice,
}

impl Subsystem {
    pub const ALL: [Subsystem; 3] = [Subsystem::Atmosphere, Subsystem::Ocean, Subsystem::Ice];
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Atmosphere => write!(f, "atmosphere"),
            Subsystem::Ocean => write!(f, "ocean"),
            Subsystem::Ice => write!(f, "ice"),
        }
    }
}

/// Terminal state of one adapter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeOutcome {
    /// The store already produced this output; nothing changed.
    AlreadyPresent,
    /// Records were added or edited.
    Inserted,
    /// No definition could be found.
    Missing,
}

/// What a run added and what it could not resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    added: BTreeMap<Subsystem, BTreeSet<String>>,
    missing: BTreeMap<Subsystem, BTreeSet<String>>,
    already_present: usize,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, subsystem: Subsystem, outcome: MergeOutcome, name: &str) {
        match outcome {
            MergeOutcome::AlreadyPresent => self.already_present += 1,
            MergeOutcome::Inserted => {
                self.added
                    .entry(subsystem)
                    .or_default()
                    .insert(name.to_string());
            }
            MergeOutcome::Missing => {
                self.missing
                    .entry(subsystem)
                    .or_default()
                    .insert(name.to_string());
            }
        }
    }

    pub fn added(&self, subsystem: Subsystem) -> Vec<&str> {
        self.added
            .get(&subsystem)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn missing(&self, subsystem: Subsystem) -> Vec<&str> {
        self.missing
            .get(&subsystem)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn total_added(&self) -> usize {
        self.added.values().map(BTreeSet::len).sum()
    }

    pub fn total_missing(&self) -> usize {
        self.missing.values().map(BTreeSet::len).sum()
    }

    pub fn already_present(&self) -> usize {
        self.already_present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_groups_by_subsystem() {
        let mut summary = RunSummary::new();
        summary.record(Subsystem::Atmosphere, MergeOutcome::Inserted, "m01s03i236");
        summary.record(Subsystem::Atmosphere, MergeOutcome::Inserted, "m01s03i236");
        summary.record(Subsystem::Ocean, MergeOutcome::Missing, "zomsf");
        summary.record(Subsystem::Ice, MergeOutcome::AlreadyPresent, "f_aice");

        assert_eq!(summary.added(Subsystem::Atmosphere), vec!["m01s03i236"]);
        assert_eq!(summary.missing(Subsystem::Ocean), vec!["zomsf"]);
        assert!(summary.added(Subsystem::Ice).is_empty());
        assert_eq!(summary.total_added(), 1);
        assert_eq!(summary.total_missing(), 1);
        assert_eq!(summary.already_present(), 1);
    }
}
