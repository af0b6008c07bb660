//! Native diagnostic codes for the three model subsystems.

use crate::error::ResolveError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static STASH_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^m(\d{2})s(\d{2})i(\d{3})(?:\[(.*)\])?$").expect("stash code pattern is valid")
});

/// Identity of an atmosphere diagnostic: (model, section, item).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StashId {
    pub model: u8,
    pub section: u16,
    pub item: u16,
}

impl StashId {
    pub fn new(model: u8, section: u16, item: u16) -> Self {
        Self {
            model,
            section,
            item,
        }
    }

    /// Zero-padded `SSIII` stem used in request record names.
    pub fn record_stem(&self) -> String {
        format!("{:02}{:03}", self.section, self.item)
    }
}

impl fmt::Display for StashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{:02}s{:02}i{:03}", self.model, self.section, self.item)
    }
}

/// Atmosphere code with optional bracketed attributes, e.g. `m01s03i236[lbproc=128]`.
///
/// Attributes refine how the code is output; they never change its [`StashId`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AtmosphereCode {
    pub id: StashId,
    pub attributes: BTreeMap<String, String>,
}

impl AtmosphereCode {
    pub fn new(id: StashId) -> Self {
        Self {
            id,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Time-processing code (`lbproc`) when one was given.
    pub fn processing(&self) -> Option<&str> {
        self.attributes.get("lbproc").map(String::as_str)
    }

    /// Level selector (`blev`) when one was given.
    pub fn level_selector(&self) -> Option<&str> {
        self.attributes.get("blev").map(String::as_str)
    }
}

impl FromStr for AtmosphereCode {
    type Err = ResolveError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let caps = STASH_CODE_RE
            .captures(text)
            .ok_or_else(|| ResolveError::MalformedExpression {
                name: text.to_string(),
                detail: "not an atmosphere code of the form mNNsNNiNNN[...]".to_string(),
            })?;

        let number = |index: usize| -> Result<u16, ResolveError> {
            caps[index]
                .parse::<u16>()
                .map_err(|e| ResolveError::MalformedExpression {
                    name: text.to_string(),
                    detail: e.to_string(),
                })
        };
        let model = number(1)? as u8;
        let id = StashId::new(model, number(2)?, number(3)?);

        let mut attributes = BTreeMap::new();
        if let Some(raw) = caps.get(4) {
            for pair in raw.as_str().split(',').filter(|p| !p.trim().is_empty()) {
                let (key, value) =
                    pair.split_once('=')
                        .ok_or_else(|| ResolveError::MalformedExpression {
                            name: text.to_string(),
                            detail: format!("attribute '{}' has no value", pair.trim()),
                        })?;
                attributes.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        Ok(Self { id, attributes })
    }
}

impl fmt::Display for AtmosphereCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if !self.attributes.is_empty() {
            let pairs = self
                .attributes
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>();
            write!(f, "[{}]", pairs.join(","))?;
        }
        Ok(())
    }
}

/// A leaf that a merge adapter can act on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NativeCode {
    Atmosphere(AtmosphereCode),
    OceanField(String),
    IceField(String),
}

impl fmt::Display for NativeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeCode::Atmosphere(code) => write!(f, "{}", code),
            NativeCode::OceanField(name) => write!(f, "ocean:{}", name),
            NativeCode::IceField(name) => write!(f, "ice:{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_code() {
        let code: AtmosphereCode = "m01s03i236".parse().unwrap();
        assert_eq!(code.id, StashId::new(1, 3, 236));
        assert!(code.attributes.is_empty());
        assert_eq!(code.to_string(), "m01s03i236");
    }

    #[test]
    fn test_parse_bracketed_code() {
        let code: AtmosphereCode = "m01s30i204[blev=P500, lbproc=128]".parse().unwrap();
        assert_eq!(code.id.to_string(), "m01s30i204");
        assert_eq!(code.processing(), Some("128"));
        assert_eq!(code.level_selector(), Some("P500"));
    }

    #[test]
    fn test_attributes_do_not_change_identity() {
        let a: AtmosphereCode = "m01s03i236[lbproc=4096]".parse().unwrap();
        let b: AtmosphereCode = "m01s03i236".parse().unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_stem_is_zero_padded() {
        assert_eq!(StashId::new(1, 0, 24).record_stem(), "00024");
        assert_eq!(StashId::new(1, 30, 204).record_stem(), "30204");
    }

    #[test]
    fn test_malformed_code() {
        assert!("m1s3i236".parse::<AtmosphereCode>().is_err());
        assert!("m01s03i236[lbproc]".parse::<AtmosphereCode>().is_err());
    }
}
