//! Ice adapter: history flags in the CICE namelists.
//!
//! Each field in `icefields_nml` carries the frequency markers it is written
//! at (`f_aice = 'md'`). Markers must also be scheduled in one of the
//! `histfreq` slots of `setup_nml`, where `'x'` marks a free slot.

use super::MergeAdapter;
use crate::tables;
use diagmerge_store::{IceFieldList, RoseConfig};
use diagmerge_types::{DiagnosticRequest, MergeOutcome, ResolveError, ResolveResult, Subsystem};
use tracing::{debug, info};

const FIELDS_SECTION: &str = "namelist:icefields_nml";
const SETUP_SECTION: &str = "namelist:setup_nml";
const FREE_SLOT: &str = "'x'";
const DAILY: &str = "'d'";

/// Namelist name of the ice field for a CF variable.
pub fn field_name(variable: &str) -> String {
    match variable {
        "ice_present" => "f_icepresent".to_string(),
        other => format!("f_{}", other),
    }
}

pub struct IceAdapter<'a> {
    store: RoseConfig,
    fields: &'a IceFieldList,
}

impl<'a> IceAdapter<'a> {
    pub fn new(store: RoseConfig, fields: &'a IceFieldList) -> Self {
        Self { store, fields }
    }

    pub fn store(&self) -> &RoseConfig {
        &self.store
    }

    pub fn into_store(self) -> RoseConfig {
        self.store
    }

    /// Whether `variable` names a field the ice model can write.
    pub fn knows(&self, variable: &str) -> bool {
        self.fields.contains(&field_name(variable))
    }

    /// Makes sure `marker` owns a `histfreq` slot.
    fn schedule(&mut self, field: &str, marker: &str) -> ResolveResult<()> {
        let origin = self.store.origin().to_string();
        let setup = self.store.get_mut(SETUP_SECTION).ok_or_else(|| {
            ResolveError::Store(format!("{} has no [{}]", origin, SETUP_SECTION))
        })?;

        let mut histfreq = split_list(setup.get("histfreq").unwrap_or_default());
        let mut histfreq_n = split_list(setup.get("histfreq_n").unwrap_or_default());
        if histfreq_n.len() < histfreq.len() {
            histfreq_n.resize(histfreq.len(), "1".to_string());
        }
        let before = histfreq.clone();

        if !histfreq.iter().any(|slot| slot == marker) {
            let slot = histfreq
                .iter()
                .position(|slot| slot == FREE_SLOT)
                .ok_or_else(|| ResolveError::ScheduleExhausted {
                    field: field.to_string(),
                    marker: marker.to_string(),
                })?;
            histfreq[slot] = marker.to_string();
            histfreq_n[slot] = "1".to_string();
        }

        // Daily output always occupies the first slot.
        if let Some(daily) = histfreq.iter().position(|slot| slot == DAILY) {
            if daily != 0 {
                let value = histfreq.remove(daily);
                histfreq.insert(0, value);
                let count = histfreq_n.remove(daily);
                histfreq_n.insert(0, count);
            }
        }
        if histfreq == before {
            return Ok(());
        }

        setup.attributes.insert("histfreq", histfreq.join(","));
        setup.attributes.insert("histfreq_n", histfreq_n.join(","));
        info!(marker, histfreq = %histfreq.join(","), "scheduled ice history frequency");
        Ok(())
    }
}

impl MergeAdapter for IceAdapter<'_> {
    type Code = str;

    fn subsystem(&self) -> Subsystem {
        Subsystem::Ice
    }

    fn ensure_present(&mut self, variable: &str, request: &DiagnosticRequest) -> ResolveResult<MergeOutcome> {
        let field = field_name(variable);
        let marker = tables::ice_marker(request.frequency.as_str()).ok_or_else(|| {
            ResolveError::UnknownFrequency {
                frequency: request.frequency.to_string(),
                context: "ice history output".to_string(),
            }
        })?;
        let flag = tables::unquoted(marker);

        let current = self
            .store
            .get(FIELDS_SECTION)
            .and_then(|section| section.get(&field))
            .map(str::to_string);
        let Some(current) = current else {
            if self.fields.contains(&field) {
                return Err(ResolveError::UnlistedIceField { field });
            }
            return Ok(MergeOutcome::Missing);
        };

        if tables::unquoted(&current).contains(flag) {
            debug!(field = %field, marker, "ice field already written at this frequency");
            return Ok(MergeOutcome::AlreadyPresent);
        }

        self.schedule(&field, marker)?;
        let updated = if tables::unquoted(&current) == "x" {
            marker.to_string()
        } else {
            format!("{}{}", current, marker).replace("''", "")
        };
        if let Some(section) = self.store.get_mut(FIELDS_SECTION) {
            section.attributes.insert(field.clone(), updated.clone());
        }
        info!(field = %field, value = %updated, "enabled ice field");
        Ok(MergeOutcome::Inserted)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
