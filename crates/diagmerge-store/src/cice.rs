//! Ice history field list, read from the Fortran namelist declaration.
//!
//! ```text
//! namelist / icefields_nml /     &
//!     f_hi,        f_hs,         &
//!     f_aice,      f_icepresent, &   ! fraction
//!     f_sst
//! ```

use crate::error::{read_file, StoreResult};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IceFieldList {
    fields: BTreeSet<String>,
}

impl IceFieldList {
    pub fn load(path: &Path) -> StoreResult<Self> {
        Ok(Self::parse(&read_file(path)?))
    }

    pub fn parse(source: &str) -> Self {
        let mut fields = BTreeSet::new();
        let mut in_list = false;

        for line in source.lines() {
            if in_list {
                let code = line.split('!').next().unwrap_or_default();
                fields.extend(
                    code.split(',')
                        .map(|item| item.trim())
                        .filter(|item| !item.is_empty() && !item.contains('&'))
                        .map(str::to_string),
                );
                if !code.contains('&') {
                    in_list = false;
                }
            }
            if line.contains("namelist") && line.contains("icefields_nml") {
                in_list = true;
            }
        }
        Self { fields }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for IceFieldList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
      logical (kind=log_kind) :: f_hi, f_hs
      namelist / icefields_nml /     &
           f_hi,        f_hs,         &
           f_aice,      f_icepresent, & ! fraction
           f_sst
      contains
           f_not_a_field
";

    #[test]
    fn test_parse_namelist_declaration() {
        let list = IceFieldList::parse(SOURCE);
        assert_eq!(list.len(), 5);
        assert!(list.contains("f_icepresent"));
        assert!(list.contains("f_sst"));
        assert!(!list.contains("f_not_a_field"));
    }
}
