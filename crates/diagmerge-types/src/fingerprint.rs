//! Content fingerprints for configuration entries.
//!
//! The digest matches the one rose uses to name stash sections, so names
//! produced here line up with entries written by the rose tidy tools.

use crate::entry::{Attributes, ConfigEntry, EntryKind};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Fields that only label a profile; never part of its identity.
const DISPLAY_FIELDS: [&str; 3] = ["use_name", "dom_name", "tim_name"];

/// 8-hex-character content hash.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of `attributes` as an entry of `kind`.
    ///
    /// Request records keep every key; for profiles and bindings the label
    /// fields are dropped so renamed copies hash the same.
    pub fn compute(kind: EntryKind, attributes: &Attributes) -> Self {
        let mut keys: Vec<&str> = attributes
            .keys()
            .filter(|key| kind == EntryKind::DiagnosticRequest || !DISPLAY_FIELDS.contains(key))
            .collect();
        keys.sort_by(|a, b| {
            a.trim_start_matches('!')
                .cmp(b.trim_start_matches('!'))
                .then_with(|| a.cmp(b))
        });

        let mut text = String::new();
        for key in keys {
            let value = attributes
                .get(key)
                .unwrap_or_default()
                .replace(['\n', '='], "");
            text.push_str(key);
            text.push('=');
            text.push_str(&value);
            text.push('\n');
        }

        let digest = Sha1::digest(text.as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(8);
        Fingerprint(hex)
    }

    pub fn of(entry: &ConfigEntry) -> Self {
        Self::compute(entry.kind(), &entry.attributes)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
