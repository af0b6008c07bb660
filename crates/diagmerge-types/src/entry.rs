//! Configuration entries: named sections of a rose store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered attribute map of one section.
///
/// Keys keep their source order so that rewritten stores read like the
/// originals. Keys may carry `!`/`!!` markers that switch them off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pairs: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Sets a value in place, or appends the key. Returns the old value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.pairs.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.pairs.iter().position(|(k, _)| k == key)?;
        Some(self.pairs.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Active, non-meta attributes minus the named keys.
    ///
    /// This is the view two profiles are compared on.
    pub fn semantic(&self, ignore: &[&str]) -> Attributes {
        self.iter()
            .filter(|(k, _)| !k.starts_with('!') && !k.contains("meta"))
            .filter(|(k, _)| !ignore.contains(k))
            .collect()
    }

    /// Same key/value pairs regardless of order.
    pub fn same_content(&self, other: &Attributes) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }

    /// Every pair of `filter` is present here with the same value.
    pub fn is_superset_of(&self, filter: &Attributes) -> bool {
        filter.iter().all(|(k, v)| self.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}

/// Role of a section, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    DiagnosticRequest,
    DomainProfile,
    TimeProfile,
    UsageBinding,
    Stream,
    Other,
}

impl EntryKind {
    pub fn of_section(name: &str) -> Self {
        if name.contains("umstash_streq") {
            EntryKind::DiagnosticRequest
        } else if name.contains("umstash_domain") {
            EntryKind::DomainProfile
        } else if name.contains("umstash_time") {
            EntryKind::TimeProfile
        } else if name.contains("umstash_use") {
            EntryKind::UsageBinding
        } else if name.contains("xios_streams") || name.contains("nlstcall_pp") {
            EntryKind::Stream
        } else {
            EntryKind::Other
        }
    }

    /// Attribute holding the display label for this kind.
    pub fn label_key(&self) -> Option<&'static str> {
        match self {
            EntryKind::DomainProfile => Some("dom_name"),
            EntryKind::TimeProfile => Some("tim_name"),
            EntryKind::UsageBinding => Some("use_name"),
            _ => None,
        }
    }
}

/// One named section with its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Section name as written, including any `!`/`!!` disabled marker.
    pub name: String,
    pub attributes: Attributes,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    pub fn kind(&self) -> EntryKind {
        EntryKind::of_section(&self.name)
    }

    /// Section name without the disabled marker.
    pub fn base_name(&self) -> &str {
        self.name.trim_start_matches('!')
    }

    pub fn is_enabled(&self) -> bool {
        !self.name.starts_with('!')
    }

    pub fn label(&self) -> Option<&str> {
        self.kind().label_key().and_then(|key| self.attributes.get(key))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }

    /// Name for a copy of this entry keyed by `fingerprint`:
    /// `namelist:umstash_time(tdaymn_1a2b3c4d)` from `namelist:umstash_time(tdaymn_0f9e8d7c)`.
    pub fn derived_name(&self, fingerprint: &str) -> String {
        derive_section_name(self.base_name(), fingerprint)
    }
}

impl fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Replaces the hash part of `prefix(stem_hash)` with `fingerprint`.
pub fn derive_section_name(name: &str, fingerprint: &str) -> String {
    match name.split_once('(') {
        Some((prefix, inner)) => {
            let inner = inner.trim_end_matches(')');
            let stem = inner.split('_').next().unwrap_or(inner);
            format!("{}({}_{})", prefix, stem, fingerprint)
        }
        None => format!("{}({})", name, fingerprint),
    }
}
