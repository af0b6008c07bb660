//! Time profiles, usage bindings and output streams of a site store.

use crate::tables;
use diagmerge_store::RoseConfig;
use diagmerge_types::{Attributes, ConfigEntry, EntryKind};
use std::collections::{BTreeMap, BTreeSet};

/// Which usages the site already routes each (time, domain) pair to.
///
/// Built from the enabled request records of a store and kept current as
/// records are added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UseMatrix {
    bindings: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl UseMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: &RoseConfig) -> Self {
        let mut matrix = Self::new();
        for entry in store.enabled(EntryKind::DiagnosticRequest) {
            if let (Some(time), Some(domain), Some(usage)) = (
                entry.get("tim_name"),
                entry.get("dom_name"),
                entry.get("use_name"),
            ) {
                matrix.record(time, domain, usage);
            }
        }
        matrix
    }

    pub fn record(&mut self, time: &str, domain: &str, usage: &str) {
        let usages = self
            .bindings
            .entry(time.to_string())
            .or_default()
            .entry(domain.to_string())
            .or_default();
        if !usages.iter().any(|u| u == usage) {
            usages.push(usage.to_string());
        }
    }

    /// First usage seen for this exact pair.
    pub fn usage_for(&self, time: &str, domain: &str) -> Option<&str> {
        self.bindings
            .get(time)?
            .get(domain)?
            .first()
            .map(String::as_str)
    }

    /// Lexically smallest usage bound to `time` over any domain.
    pub fn smallest_for_time(&self, time: &str) -> Option<&str> {
        self.bindings
            .get(time)?
            .values()
            .flatten()
            .map(String::as_str)
            .min()
    }

    pub fn contains_time(&self, time: &str) -> bool {
        self.bindings.contains_key(time)
    }
}

/// Usage labels bound by enabled usage entries.
pub fn usage_labels(store: &RoseConfig) -> BTreeSet<String> {
    store
        .enabled(EntryKind::UsageBinding)
        .filter_map(|entry| entry.label())
        .map(str::to_string)
        .collect()
}

/// Stream id of a stream entry: its `file_id`, else the id in its section name.
pub fn stream_id(entry: &ConfigEntry) -> Option<String> {
    if let Some(file_id) = entry.get("file_id") {
        return Some(tables::unquoted(file_id).to_string());
    }
    let (_, inner) = entry.base_name().split_once('(')?;
    Some(inner.trim_end_matches(')').to_string())
}

/// Enabled streams of a store: id to unquoted `filename_base`.
pub fn streams(store: &RoseConfig) -> BTreeMap<String, Option<String>> {
    store
        .enabled(EntryKind::Stream)
        .filter_map(|entry| {
            let base = entry
                .get("filename_base")
                .map(|b| tables::unquoted(b).to_string());
            stream_id(entry).map(|id| (id, base))
        })
        .collect()
}

/// Enabled time profiles carrying every attribute of `filter`.
pub fn matching_time_profiles<'s>(store: &'s RoseConfig, filter: &Attributes) -> Vec<&'s ConfigEntry> {
    store
        .enabled(EntryKind::TimeProfile)
        .filter(|entry| entry.attributes.is_superset_of(filter))
        .collect()
}

/// Picks one profile: the canonical label when present, else the smallest label.
pub fn choose_time_profile<'s>(
    candidates: &[&'s ConfigEntry],
    canonical: Option<&str>,
) -> Option<&'s ConfigEntry> {
    if let Some(label) = canonical {
        if let Some(entry) = candidates.iter().find(|e| e.label() == Some(label)) {
            return Some(*entry);
        }
    }
    candidates
        .iter()
        .min_by(|a, b| a.label().cmp(&b.label()).then_with(|| a.name.cmp(&b.name)))
        .copied()
}

/// Usage of the first reference request sampled on time profile `time`.
pub fn reference_usage_hint(reference: &RoseConfig, time: &str) -> Option<String> {
    reference
        .enabled(EntryKind::DiagnosticRequest)
        .find(|entry| entry.get("tim_name") == Some(time))
        .and_then(|entry| entry.get("use_name"))
        .map(str::to_string)
}
