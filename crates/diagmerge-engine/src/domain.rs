//! Domain profile lookups: labels, level types and pseudo-level coverage.

use diagmerge_store::RoseConfig;
use diagmerge_types::{Attributes, ConfigEntry, EntryKind, LevelFacts, LevelType, ResolveError, ResolveResult};

/// Enabled domain profile labelled `label`.
pub fn find_by_label<'s>(store: &'s RoseConfig, label: &str) -> Option<&'s ConfigEntry> {
    store
        .enabled(EntryKind::DomainProfile)
        .find(|entry| entry.label() == Some(label))
}

/// Enabled domain profile with the same semantic content as `profile`.
pub fn find_equivalent<'s>(store: &'s RoseConfig, profile: &Attributes) -> Option<&'s ConfigEntry> {
    let wanted = profile.semantic(&[]);
    store
        .enabled(EntryKind::DomainProfile)
        .find(|entry| entry.attributes.semantic(&[]).same_content(&wanted))
}

/// Level type (`iopl`) a domain profile outputs on.
pub fn level_of(entry: &ConfigEntry) -> ResolveResult<LevelType> {
    let raw = entry.get("iopl").ok_or_else(|| {
        ResolveError::Store(format!("domain profile {} has no iopl", entry.name))
    })?;
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(LevelType::from_code)
        .ok_or_else(|| {
            ResolveError::Store(format!(
                "domain profile {} has unknown level type iopl={}",
                entry.name, raw
            ))
        })
}

/// Pseudo-level values listed by a domain profile, in order.
pub fn pseudo_levels(entry: &ConfigEntry) -> Vec<i64> {
    entry
        .get("pslist")
        .map(|raw| {
            raw.replace(['\n', '='], "")
                .split(',')
                .filter_map(|item| item.trim().parse::<i64>().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Whether `entry` outputs the pseudo-levels of a code described by `facts`.
///
/// The profile must share the pseudo-level type and level type, and its
/// pseudo-level list must include every value in the code's range.
pub fn covers_pseudo_range(entry: &ConfigEntry, facts: &LevelFacts) -> bool {
    let same_type = entry
        .get("plt")
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        == Some(facts.pseudo_type);
    let same_level = entry
        .get("iopl")
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        == Some(facts.level_type.code());
    if !same_type || !same_level {
        return false;
    }
    let levels = pseudo_levels(entry);
    !levels.is_empty() && (facts.pseudo_first..=facts.pseudo_last).all(|l| levels.contains(&l))
}

/// First enabled domain profile covering the pseudo-levels of `facts`.
pub fn find_pseudo_domain<'s>(store: &'s RoseConfig, facts: &LevelFacts) -> Option<&'s ConfigEntry> {
    store
        .enabled(EntryKind::DomainProfile)
        .find(|entry| covers_pseudo_range(entry, facts))
}
