//! Which atmosphere site store a run edits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The UM reads its requests from the `um` app; XIOS (netCDF) output is
/// configured by a second copy of the same records in the `xml` app.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StashFlavor {
    Um,
    #[default]
    Xios,
}

impl StashFlavor {
    /// Suite app holding the atmosphere store.
    pub fn app(&self) -> &'static str {
        match self {
            StashFlavor::Um => "um",
            StashFlavor::Xios => "xml",
        }
    }
}

impl fmt::Display for StashFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StashFlavor::Um => write!(f, "um"),
            StashFlavor::Xios => write!(f, "xios"),
        }
    }
}

impl FromStr for StashFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "um" => Ok(StashFlavor::Um),
            "xios" => Ok(StashFlavor::Xios),
            other => Err(format!("unknown stash flavor '{}', expected um or xios", other)),
        }
    }
}
