//! Rose `key=value` section files.
//!
//! Layout:
//!
//! ```text
//! meta=um-atmos/vn13.0          top-level pairs before the first section
//!
//! [namelist:umstash_domain(diag_1a2b3c4d)]
//! dom_name='DIAG'
//! !!imn=1                       switched-off key
//! rlevlst=1,2,3,
//!        =4,5                   continuation line
//!
//! [!namelist:umstash_streq(03236_0a1b2c3d)]   switched-off section
//! ```
//!
//! Comments and blank lines stay attached to the section or key that follows
//! them, so a file that is loaded and written back unchanged reproduces its
//! source.

use crate::error::{read_file, StoreError, StoreResult};
use diagmerge_types::{Attributes, ConfigEntry, EntryKind};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    entry: ConfigEntry,
    /// Comment and blank lines above the header.
    leading: Vec<String>,
    /// Comment lines above individual keys.
    key_comments: BTreeMap<String, Vec<String>>,
}

/// A parsed rose configuration file.
#[derive(Debug, Clone, Default)]
pub struct RoseConfig {
    origin: String,
    preamble: Vec<String>,
    top_level: Attributes,
    sections: Vec<Section>,
    index: HashMap<String, usize>,
    trailing: Vec<String>,
}

enum Cursor {
    Preamble(Option<String>),
    Section(usize, Option<String>),
}

impl RoseConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = read_file(path)?;
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn parse(origin: &str, text: &str) -> StoreResult<Self> {
        let mut config = RoseConfig::new(origin);
        let mut pending: Vec<String> = Vec::new();
        let mut cursor = Cursor::Preamble(None);

        for (number, line) in text.lines().enumerate() {
            let number = number + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                pending.push(line.to_string());
                // A blank or comment line ends any continuation.
                cursor = match cursor {
                    Cursor::Preamble(_) => Cursor::Preamble(None),
                    Cursor::Section(index, _) => Cursor::Section(index, None),
                };
                continue;
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                let name = trimmed[1..trimmed.len() - 1].trim().to_string();
                let existing = config.index.get(&name).copied();
                let index = match existing {
                    Some(index) => {
                        warn!(origin = %config.origin, section = %name, "duplicate section merged");
                        index
                    }
                    None => {
                        let leading = std::mem::take(&mut pending);
                        config.push_section(ConfigEntry::new(name, Attributes::new()), leading)
                    }
                };
                cursor = Cursor::Section(index, None);
                continue;
            }

            let continues = line.starts_with(' ') || line.starts_with('\t');
            match &mut cursor {
                Cursor::Section(index, Some(key)) if continues => {
                    let attributes = &mut config.sections[*index].entry.attributes;
                    let joined =
                        format!("{}\n{}", attributes.get(key).unwrap_or_default(), trimmed);
                    attributes.insert(key.clone(), joined);
                    continue;
                }
                Cursor::Preamble(Some(key)) if continues => {
                    let joined = format!(
                        "{}\n{}",
                        config.top_level.get(key).unwrap_or_default(),
                        trimmed
                    );
                    config.top_level.insert(key.clone(), joined);
                    config.preamble.push(line.to_string());
                    continue;
                }
                _ => {}
            }

            let (key, value) = trimmed.split_once('=').ok_or_else(|| {
                StoreError::parse(origin, number, format!("expected key=value, found '{}'", trimmed))
            })?;
            let key = key.trim().to_string();
            let value = value.trim().to_string();

            cursor = match cursor {
                Cursor::Preamble(_) => {
                    config.preamble.append(&mut pending);
                    config.preamble.push(line.to_string());
                    config.top_level.insert(key.clone(), value);
                    Cursor::Preamble(Some(key))
                }
                Cursor::Section(index, _) => {
                    let section = &mut config.sections[index];
                    if !pending.is_empty() {
                        section
                            .key_comments
                            .insert(key.clone(), std::mem::take(&mut pending));
                    }
                    section.entry.attributes.insert(key.clone(), value);
                    Cursor::Section(index, Some(key))
                }
            };
        }

        config.trailing = pending;
        Ok(config)
    }

    fn push_section(&mut self, entry: ConfigEntry, leading: Vec<String>) -> usize {
        let index = self.sections.len();
        self.index.insert(entry.name.clone(), index);
        self.sections.push(Section {
            entry,
            leading,
            key_comments: BTreeMap::new(),
        });
        index
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Top-level value set before the first section.
    pub fn top_level(&self, key: &str) -> Option<&str> {
        self.top_level.get(key)
    }

    pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
        self.index.get(name).map(|&i| &self.sections[i].entry)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ConfigEntry> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.sections[i].entry),
            None => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConfigEntry> + '_ {
        self.sections.iter().map(|s| &s.entry)
    }

    /// Switched-on entries of one kind, in file order.
    pub fn enabled(&self, kind: EntryKind) -> impl Iterator<Item = &ConfigEntry> + '_ {
        self.entries()
            .filter(move |e| e.is_enabled() && e.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Adds `entry`, or replaces the attributes of the section with its name.
    pub fn insert(&mut self, entry: ConfigEntry) {
        if let Some(&index) = self.index.get(&entry.name) {
            self.sections[index].entry.attributes = entry.attributes;
            return;
        }
        let leading = if self.sections.is_empty() && self.preamble.is_empty() {
            Vec::new()
        } else {
            vec![String::new()]
        };
        self.push_section(entry, leading);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.preamble {
            out.push_str(line);
            out.push('\n');
        }
        for section in &self.sections {
            for line in &section.leading {
                out.push_str(line);
                out.push('\n');
            }
            out.push('[');
            out.push_str(&section.entry.name);
            out.push_str("]\n");
            for (key, value) in section.entry.attributes.iter() {
                if let Some(comments) = section.key_comments.get(key) {
                    for line in comments {
                        out.push_str(line);
                        out.push('\n');
                    }
                }
                write_pair(&mut out, key, value);
            }
        }
        for line in &self.trailing {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    pub fn save(&self, path: &Path) -> StoreResult<()> {
        std::fs::write(path, self.render()).map_err(|e| StoreError::io(path, e))
    }
}

fn write_pair(out: &mut String, key: &str, value: &str) {
    let mut lines = value.split('\n');
    out.push_str(key);
    out.push('=');
    out.push_str(lines.next().unwrap_or_default());
    out.push('\n');
    for line in lines {
        // Continuations line their '=' up under the key's.
        let pad = if line.starts_with('=') { key.len() } else { key.len() + 1 };
        out.push_str(&" ".repeat(pad));
        out.push_str(line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
meta=um-atmos/vn13.0

[command]
default=um-atmos

# daily means
[namelist:umstash_time(tdaymn_5c8f1a2b)]
ifre=1
isam=1
!!iopt=1
ityp=3
tim_name='TDAYMN'
unt1=3

[!namelist:umstash_domain(dallth_0a1b2c3d)]
dom_name='DALLTH'
# model levels
rlevlst=1,2,3,
       =4,5
";

    #[test]
    fn test_parse_sections_and_preamble() {
        let rose = RoseConfig::parse("sample", SAMPLE).unwrap();
        assert_eq!(rose.top_level("meta"), Some("um-atmos/vn13.0"));
        assert_eq!(rose.len(), 3);

        let time = rose.get("namelist:umstash_time(tdaymn_5c8f1a2b)").unwrap();
        assert_eq!(time.kind(), EntryKind::TimeProfile);
        assert_eq!(time.get("!!iopt"), Some("1"));
        assert_eq!(time.label(), Some("'TDAYMN'"));
    }

    #[test]
    fn test_continuation_lines_join_with_newline() {
        let rose = RoseConfig::parse("sample", SAMPLE).unwrap();
        let domain = rose.get("!namelist:umstash_domain(dallth_0a1b2c3d)").unwrap();
        assert!(!domain.is_enabled());
        assert_eq!(domain.get("rlevlst"), Some("1,2,3,\n=4,5"));
    }

    #[test]
    fn test_enabled_skips_switched_off_sections() {
        let rose = RoseConfig::parse("sample", SAMPLE).unwrap();
        assert_eq!(rose.enabled(EntryKind::DomainProfile).count(), 0);
        assert_eq!(rose.enabled(EntryKind::TimeProfile).count(), 1);
    }

    #[test]
    fn test_unmodified_file_round_trips() {
        let rose = RoseConfig::parse("sample", SAMPLE).unwrap();
        assert_eq!(rose.render(), SAMPLE);
    }

    #[test]
    fn test_insert_appends_after_blank_line() {
        let mut rose = RoseConfig::parse("sample", SAMPLE).unwrap();
        let attrs: Attributes = [("file_id", "'pp1'"), ("locn", "3")].into_iter().collect();
        rose.insert(ConfigEntry::new("namelist:umstash_use(upm_12345678)", attrs));
        let text = rose.render();
        assert!(text.ends_with("\n\n[namelist:umstash_use(upm_12345678)]\nfile_id='pp1'\nlocn=3\n"));
    }

    #[test]
    fn test_key_outside_format_is_an_error() {
        let err = RoseConfig::parse("broken", "[a]\nnot a pair\n").unwrap_err();
        assert!(err.to_string().contains("broken:2"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rose-app.conf");
        let rose = RoseConfig::parse("sample", SAMPLE).unwrap();
        rose.save(&path).unwrap();
        let back = RoseConfig::load(&path).unwrap();
        assert_eq!(back.render(), SAMPLE);
    }
}
