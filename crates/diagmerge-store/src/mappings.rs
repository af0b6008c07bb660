//! CF-to-native mapping catalog.
//!
//! Mapping files use the rose section syntax with `key = value` pairs:
//!
//! ```text
//! [DEFAULT]
//! mip_table_id = Amon
//!
//! [tas]
//! dimension = longitude latitude height2m time
//! expression = m01s03i236[lbproc=128]
//! ```
//!
//! `[DEFAULT]` values are inherited by every section. When several files are
//! given, later files override earlier ones key by key.

use crate::error::{read_file, StoreResult};
use crate::rose::RoseConfig;
use diagmerge_types::Attributes;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_SECTION: &str = "DEFAULT";

/// Expression bound to one CF name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub name: String,
    pub expression: String,
    pub dimension: Option<String>,
    pub mip_table_id: Option<String>,
}

impl Mapping {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            dimension: None,
            mip_table_id: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.mip_table_id = Some(table.into());
        self
    }

    /// Fixed (time-invariant) ocean fields never need output requests.
    pub fn is_fixed_field(&self) -> bool {
        self.mip_table_id.as_deref().map(str::trim) == Some("Ofx")
    }
}

#[derive(Debug, Clone, Default)]
pub struct MappingCatalog {
    mappings: BTreeMap<String, Mapping>,
}

impl MappingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(paths: &[PathBuf]) -> StoreResult<Self> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            sources.push((path.display().to_string(), read_file(path)?));
        }
        let borrowed: Vec<(&str, &str)> = sources
            .iter()
            .map(|(origin, text)| (origin.as_str(), text.as_str()))
            .collect();
        Self::from_sources(&borrowed)
    }

    pub fn from_sources(sources: &[(&str, &str)]) -> StoreResult<Self> {
        let mut defaults = Attributes::new();
        let mut sections: BTreeMap<String, Attributes> = BTreeMap::new();

        for (origin, text) in sources {
            let file = RoseConfig::parse(origin, text)?;
            for entry in file.entries() {
                let target = if entry.name == DEFAULT_SECTION {
                    &mut defaults
                } else {
                    sections.entry(entry.name.clone()).or_default()
                };
                for (key, value) in entry.attributes.iter() {
                    target.insert(key, value);
                }
            }
        }

        let mut catalog = MappingCatalog::new();
        for (name, attributes) in sections {
            let lookup = |key: &str| {
                attributes
                    .get(key)
                    .or_else(|| defaults.get(key))
                    .map(str::to_string)
            };
            let Some(expression) = lookup("expression") else {
                debug!(section = %name, "mapping section has no expression");
                continue;
            };
            catalog.insert(Mapping {
                name: name.clone(),
                expression,
                dimension: lookup("dimension"),
                mip_table_id: lookup("mip_table_id"),
            });
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, mapping: Mapping) {
        self.mappings.insert(mapping.name.clone(), mapping);
    }

    pub fn get(&self, name: &str) -> Option<&Mapping> {
        self.mappings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mappings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
