//! Fixed lookup tables shared by the resolvers and adapters.

use diagmerge_types::{Attributes, DomainDescriptor, LevelType};
use std::collections::BTreeMap;

/// Processing code assumed when a code carries no `lbproc`.
pub const DEFAULT_LBPROC: &str = "128";

pub const FULL_LEVEL_DESCRIPTOR: &str = "longitude latitude alevel time";
pub const HALF_LEVEL_DESCRIPTOR: &str = "longitude latitude alevhalf time";
pub const SINGLE_LEVEL_DESCRIPTOR: &str = "longitude latitude time";

/// Descriptor token naming the soil aggregate dimension.
pub const SOIL_TOKEN: &str = "sdepth";

const DESCRIPTOR_LABELS: &[(&str, &str)] = &[
    ("longitude latitude time", "'DIAG'"),
    ("longitude latitude height2m time", "'DIAG'"),
    ("longitude latitude height10m time", "'DIAG'"),
    ("longitude latitude typesi time", "'DIAG'"),
    ("longitude latitude alevel time", "'DALLTH'"),
    ("longitude latitude alevhalf time", "'DALLRH'"),
    ("longitude latitude plev8 time", "'PLEV8'"),
    ("longitude latitude plev19 time", "'PLEV19'"),
    ("longitude latitude plev14 time", "'PLEV14'"),
    ("longitude latitude soil time", "'DSOIL'"),
    ("longitude latitude sdepth time", "'DSOIL'"),
    ("longitude latitude sdepth1 time", "'DSOIL1'"),
];

/// Descriptor to domain label, built-in rows plus operator additions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTable {
    rows: Vec<(DomainDescriptor, String)>,
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self {
            rows: DESCRIPTOR_LABELS
                .iter()
                .map(|(descriptor, label)| (DomainDescriptor::parse(descriptor), label.to_string()))
                .collect(),
        }
    }
}

impl DescriptorTable {
    pub fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    /// Adds or replaces the row for `descriptor`.
    pub fn set(&mut self, descriptor: &str, label: &str) {
        let descriptor = DomainDescriptor::parse(descriptor);
        let label = quoted(label);
        match self.rows.iter_mut().find(|(d, _)| *d == descriptor) {
            Some((_, slot)) => *slot = label,
            None => self.rows.push((descriptor, label)),
        }
    }

    pub fn label_for(&self, descriptor: &DomainDescriptor) -> Option<&str> {
        self.rows
            .iter()
            .find(|(d, _)| d == descriptor)
            .map(|(_, label)| label.as_str())
    }
}

/// Time-processing code (`ityp`) for an `lbproc` value.
pub fn time_operation(lbproc: &str) -> Option<&'static str> {
    match lbproc.trim() {
        "128" => Some("3"),
        "4096" => Some("6"),
        "8192" => Some("5"),
        _ => None,
    }
}

/// Label preferred when several site time profiles fit a frequency.
pub fn canonical_time_label(frequency: &str) -> Option<&'static str> {
    match frequency {
        "mon" => Some("'TMONMN'"),
        "day" => Some("'TDAYMN'"),
        _ => None,
    }
}

/// Attributes a time profile must carry to sample at `frequency`.
pub fn frequency_filter(frequency: &str) -> Option<Attributes> {
    let pairs: &[(&str, &str)] = match frequency {
        "mon" => &[("ifre", "30"), ("unt1", "3"), ("unt2", "1"), ("unt3", "3")],
        "day" => &[("ifre", "1"), ("unt1", "3"), ("unt2", "1"), ("unt3", "3")],
        "6hrPt" => &[("ifre", "6"), ("istr", "6"), ("ityp", "1"), ("unt3", "2")],
        _ => return None,
    };
    Some(pairs.iter().copied().collect())
}

/// Usage labels per frequency used when the usage matrix has no answer.
pub fn default_usage() -> BTreeMap<String, String> {
    [("mon", "'UPM'"), ("day", "'UPD'")]
        .into_iter()
        .map(|(frequency, usage)| (frequency.to_string(), usage.to_string()))
        .collect()
}

/// Ice history frequency marker, quoted as it appears in the namelist.
pub fn ice_marker(frequency: &str) -> Option<&'static str> {
    match frequency {
        "mon" => Some("'m'"),
        "day" => Some("'d'"),
        "hour" | "1hr" => Some("'h'"),
        "timestep" => Some("'1'"),
        "year" | "yr" => Some("'y'"),
        _ => None,
    }
}

/// Ocean output frequency for a frequency class.
pub fn ocean_frequency(frequency: &str) -> Option<&'static str> {
    match frequency {
        "mon" => Some("1mo"),
        "day" => Some("1d"),
        _ => None,
    }
}

/// Rule for a domain whose level type differs from the code's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Keep the domain; the level mismatch is handled downstream.
    Accept(&'static str),
    /// Use the domain of this descriptor instead.
    Switch(&'static str),
    /// Add this token to the requested descriptor.
    Extend(&'static str),
}

/// Coercion for a `(domain level, code level)` pair.
pub fn coerce(domain: LevelType, code: LevelType) -> Option<Coercion> {
    use LevelType::*;
    match (domain, code) {
        (Pressure, Theta) => Some(Coercion::Accept(
            "theta-level code on pressure levels; interpolated on output",
        )),
        (Pressure, Rho) => Some(Coercion::Accept(
            "rho-level code on pressure levels; interpolated on output",
        )),
        (Rho, Theta) => Some(Coercion::Switch(FULL_LEVEL_DESCRIPTOR)),
        (Theta, Rho) => Some(Coercion::Switch(HALF_LEVEL_DESCRIPTOR)),
        (Rho, Single) | (Theta, Single) => Some(Coercion::Switch(SINGLE_LEVEL_DESCRIPTOR)),
        (Single, Soil) => Some(Coercion::Extend(SOIL_TOKEN)),
        _ => None,
    }
}

/// Wraps `value` in single quotes unless it already is.
pub fn quoted(value: &str) -> String {
    let value = value.trim();
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        value.to_string()
    } else {
        format!("'{}'", value.trim_matches('\''))
    }
}

pub fn unquoted(value: &str) -> &str {
    value.trim().trim_matches('\'')
}
