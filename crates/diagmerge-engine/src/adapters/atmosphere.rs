//! Atmosphere adapter: STASH request records in the UM or XIOS rose app.

use super::MergeAdapter;
use crate::compat::CompatibilityResolver;
use diagmerge_store::RoseConfig;
use diagmerge_types::{
    Attributes, AtmosphereCode, ConfigEntry, DiagnosticRequest, DomainDescriptor, EntryKind,
    Fingerprint, FrequencyClass, MergeOutcome, ResolveError, ResolveResult, StashId, Subsystem,
};
use tracing::{debug, info, warn};

/// Only the atmosphere model's codes can be requested.
const ATMOSPHERE_MODEL: u8 = 1;

pub struct AtmosphereAdapter<'a> {
    resolver: CompatibilityResolver<'a>,
    added: Vec<StashId>,
}

impl<'a> AtmosphereAdapter<'a> {
    pub fn new(resolver: CompatibilityResolver<'a>) -> Self {
        Self {
            resolver,
            added: Vec::new(),
        }
    }

    pub fn store(&self) -> &RoseConfig {
        self.resolver.site()
    }

    pub fn into_store(self) -> RoseConfig {
        self.resolver.into_site()
    }

    /// Codes a request record was added for, in order.
    pub fn added(&self) -> &[StashId] {
        &self.added
    }

    /// Enabled request for `id` on exactly this domain and time, if any.
    pub fn find_request(&self, id: &StashId, domain: &str, time: &str) -> Option<&ConfigEntry> {
        self.resolver
            .site()
            .enabled(EntryKind::DiagnosticRequest)
            .find(|entry| {
                number(entry.get("isec")) == Some(id.section)
                    && number(entry.get("item")) == Some(id.item)
                    && entry.get("dom_name") == Some(domain)
                    && entry.get("tim_name") == Some(time)
            })
    }

    /// Adds a request for `id` on `domain` and `time` unless one exists.
    pub fn merge(
        &mut self,
        id: StashId,
        domain: &str,
        time: &str,
        frequency: &FrequencyClass,
    ) -> ResolveResult<MergeOutcome> {
        if let Some(existing) = self.find_request(&id, domain, time) {
            debug!(code = %id, section = %existing.name, "request already present");
            return Ok(MergeOutcome::AlreadyPresent);
        }

        let usage = self.resolver.resolve_usage(time, domain, frequency)?;
        let attributes: Attributes = [
            ("dom_name", domain.to_string()),
            ("ens_name", "''".to_string()),
            ("isec", id.section.to_string()),
            ("item", id.item.to_string()),
            ("package", "'EXTRA'".to_string()),
            ("tim_name", time.to_string()),
            ("use_name", usage.clone()),
        ]
        .into_iter()
        .collect();
        let fingerprint = Fingerprint::compute(EntryKind::DiagnosticRequest, &attributes);
        let name = format!(
            "namelist:umstash_streq({}_{})",
            id.record_stem(),
            fingerprint
        );
        self.resolver
            .site_mut()
            .insert(ConfigEntry::new(name.clone(), attributes));
        self.resolver.matrix_mut().record(time, domain, &usage);
        self.added.push(id);

        info!(code = %id, domain, time, usage = %usage, section = %name, "added request");
        Ok(MergeOutcome::Inserted)
    }

    fn check_level_selector(code: &AtmosphereCode, descriptor: &DomainDescriptor) {
        let Some(selector) = code.level_selector() else {
            return;
        };
        let mut selector = selector.to_lowercase();
        if selector == "0.05" {
            selector = "sdepth1".to_string();
        }
        if descriptor.contains(&selector) {
            debug!(code = %code.id, level = %selector, "level selector matches the domain");
        } else if descriptor.tokens().any(|t| t.starts_with("plev")) {
            debug!(code = %code.id, level = %selector, "level selector on pressure levels");
        } else {
            warn!(
                code = %code.id,
                level = %selector,
                descriptor = %descriptor,
                "level selector is not part of the requested domain; the whole domain is output"
            );
        }
    }
}

impl MergeAdapter for AtmosphereAdapter<'_> {
    type Code = AtmosphereCode;

    fn subsystem(&self) -> Subsystem {
        Subsystem::Atmosphere
    }

    fn ensure_present(
        &mut self,
        code: &AtmosphereCode,
        request: &DiagnosticRequest,
    ) -> ResolveResult<MergeOutcome> {
        if code.id.model != ATMOSPHERE_MODEL {
            return Err(ResolveError::Store(format!(
                "{} belongs to model {:02}; only atmosphere codes can be requested",
                code, code.id.model
            )));
        }
        let choice = self.resolver.resolve_domain(code, &request.domain)?;
        Self::check_level_selector(code, &choice.descriptor);
        let time = self.resolver.resolve_time(&request.frequency, code)?;
        self.merge(code.id, &choice.label, &time, &request.frequency)
    }
}

fn number(value: Option<&str>) -> Option<u16> {
    value?.trim().parse().ok()
}
