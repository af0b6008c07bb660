//! Vertical level types and per-code level facts from the STASHmaster table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// STASHmaster level type code (`LevelT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LevelType {
    Unspecified,
    Rho,
    Theta,
    Pressure,
    Height,
    Single,
    Soil,
    PotentialTemperature,
}

impl LevelType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LevelType::Unspecified),
            1 => Some(LevelType::Rho),
            2 => Some(LevelType::Theta),
            3 => Some(LevelType::Pressure),
            4 => Some(LevelType::Height),
            5 => Some(LevelType::Single),
            6 => Some(LevelType::Soil),
            7 => Some(LevelType::PotentialTemperature),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            LevelType::Unspecified => 0,
            LevelType::Rho => 1,
            LevelType::Theta => 2,
            LevelType::Pressure => 3,
            LevelType::Height => 4,
            LevelType::Single => 5,
            LevelType::Soil => 6,
            LevelType::PotentialTemperature => 7,
        }
    }
}

impl fmt::Display for LevelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LevelType::Unspecified => "unspecified",
            LevelType::Rho => "rho",
            LevelType::Theta => "theta",
            LevelType::Pressure => "pressure",
            LevelType::Height => "height",
            LevelType::Single => "single",
            LevelType::Soil => "soil",
            LevelType::PotentialTemperature => "potential-temperature",
        };
        f.write_str(name)
    }
}

/// Level and pseudo-level facts for one atmosphere code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelFacts {
    /// Human-readable name from the table.
    pub name: String,
    pub level_type: LevelType,
    /// Pseudo-level type (`PseudT`); zero when the code has no pseudo-levels.
    pub pseudo_type: i64,
    pub pseudo_first: i64,
    pub pseudo_last: i64,
}

impl LevelFacts {
    pub fn has_pseudo_levels(&self) -> bool {
        self.pseudo_type != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_codes_round_trip() {
        for code in 0..=7 {
            let level = LevelType::from_code(code).unwrap();
            assert_eq!(level.code(), code);
        }
        assert_eq!(LevelType::from_code(9), None);
    }
}
