//! STASHmaster level facts.
//!
//! Each diagnostic is a block of numbered lines; only the first two matter:
//!
//! ```text
//! 1|    1 |    3 | 236 |TEMPERATURE AT 1.5M                 |
//! 2|    1 |    0 |   1 |   1 |    5 |   -1 |   -1 |    0 |    0 |    0 |    0 |
//! ```
//!
//! Line 1 is `model|section|item|name`; line 2 is
//! `space|point|time|grid|LevelT|LevelF|LevelL|PseudT|PseudF|PseudL|LevCom`.
//! A model number of `-1` ends the table.

use crate::error::{read_file, StoreError, StoreResult};
use diagmerge_types::{LevelFacts, LevelType, StashId};
use std::collections::HashMap;
use std::path::Path;

const LEVEL_T: usize = 5;
const PSEUD_T: usize = 8;
const PSEUD_F: usize = 9;
const PSEUD_L: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct StashMaster {
    facts: HashMap<StashId, LevelFacts>,
}

impl StashMaster {
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = read_file(path)?;
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn parse(origin: &str, text: &str) -> StoreResult<Self> {
        let mut master = StashMaster::default();
        let mut current: Option<(StashId, String)> = None;

        for (number, line) in text.lines().enumerate() {
            let number = number + 1;
            let fields: Vec<&str> = line.split('|').collect();
            match fields.first().copied() {
                Some("1") => {
                    let model = field(&fields, 1, origin, number)?;
                    if model == "-1" {
                        break;
                    }
                    let id = StashId::new(
                        parse_number(model, origin, number)? as u8,
                        parse_number(field(&fields, 2, origin, number)?, origin, number)? as u16,
                        parse_number(field(&fields, 3, origin, number)?, origin, number)? as u16,
                    );
                    let name = fields.get(4).map(|s| s.trim()).unwrap_or_default();
                    current = Some((id, name.to_string()));
                }
                Some("2") => {
                    let Some((id, name)) = current.take() else {
                        return Err(StoreError::parse(origin, number, "level line without a header line"));
                    };
                    let code = parse_number(field(&fields, LEVEL_T, origin, number)?, origin, number)?;
                    let level_type = LevelType::from_code(code).ok_or_else(|| {
                        StoreError::parse(origin, number, format!("unknown level type {} for {}", code, id))
                    })?;
                    let facts = LevelFacts {
                        name,
                        level_type,
                        pseudo_type: parse_number(field(&fields, PSEUD_T, origin, number)?, origin, number)?,
                        pseudo_first: parse_number(field(&fields, PSEUD_F, origin, number)?, origin, number)?,
                        pseudo_last: parse_number(field(&fields, PSEUD_L, origin, number)?, origin, number)?,
                    };
                    master.facts.insert(id, facts);
                }
                _ => {}
            }
        }
        Ok(master)
    }

    pub fn insert(&mut self, id: StashId, facts: LevelFacts) {
        self.facts.insert(id, facts);
    }

    pub fn facts(&self, id: &StashId) -> Option<&LevelFacts> {
        self.facts.get(id)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

fn field<'a>(fields: &[&'a str], index: usize, origin: &str, line: usize) -> StoreResult<&'a str> {
    fields
        .get(index)
        .map(|s| s.trim())
        .ok_or_else(|| StoreError::parse(origin, line, format!("missing column {}", index)))
}

fn parse_number(text: &str, origin: &str, line: usize) -> StoreResult<i64> {
    text.parse::<i64>()
        .map_err(|_| StoreError::parse(origin, line, format!("'{}' is not a number", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
H1| SUBMODEL_NUMBER=1
#|Model |Sectn | Item |Name                                |
1|    1 |    3 | 236 |TEMPERATURE AT 1.5M                 |
2|    1 |    0 |   1 |   1 |    5 |   -1 |   -1 |    0 |    0 |    0 |    0 |
3| 000000000000000000000000000000 | 00000000000000000001 |    1 |
1|    1 |    3 | 317 |SURFACE TILE FRACTIONS              |
2|    1 |    0 |   1 |   1 |    5 |   -1 |   -1 |    9 |    1 |   27 |    0 |
1|   -1 |   -1 |  -1 |END OF FILE MARK                    |
1|    1 |   99 |   1 |AFTER THE END                       |
2|    1 |    0 |   1 |   1 |    5 |   -1 |   -1 |    0 |    0 |    0 |    0 |
";

    #[test]
    fn test_parse_level_facts() {
        let master = StashMaster::parse("STASHmaster_A", SAMPLE).unwrap();
        assert_eq!(master.len(), 2);

        let tas = master.facts(&StashId::new(1, 3, 236)).unwrap();
        assert_eq!(tas.level_type, LevelType::Single);
        assert!(!tas.has_pseudo_levels());
        assert_eq!(tas.name, "TEMPERATURE AT 1.5M");

        let tiles = master.facts(&StashId::new(1, 3, 317)).unwrap();
        assert_eq!(tiles.pseudo_type, 9);
        assert_eq!((tiles.pseudo_first, tiles.pseudo_last), (1, 27));
    }

    #[test]
    fn test_end_marker_stops_parsing() {
        let master = StashMaster::parse("STASHmaster_A", SAMPLE).unwrap();
        assert!(master.facts(&StashId::new(1, 99, 1)).is_none());
    }

    #[test]
    fn test_unknown_level_type_is_an_error() {
        let text = "1| 1 | 3 | 1 |X|\n2| 1 | 0 | 1 | 1 | 9 | -1 | -1 | 0 | 0 | 0 | 0 |\n";
        assert!(StashMaster::parse("bad", text).is_err());
    }
}
