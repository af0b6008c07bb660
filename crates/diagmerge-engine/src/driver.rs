//! Request-driven resolution.
//!
//! Each request is expanded through the mapping catalog until only native
//! codes remain, and every code is handed to the adapter of its subsystem.
//! Atmosphere codes of an expression are merged before its sub-diagnostics.

use crate::adapters::{ice, AtmosphereAdapter, IceAdapter, MergeAdapter, OceanAdapter};
use crate::compat::CompatibilityResolver;
use crate::expression::resolve_expression;
use crate::policy::Policy;
use diagmerge_store::{IceFieldList, MappingCatalog, RoseConfig, StashMaster, XmlTree};
use diagmerge_types::{
    AtmosphereCode, DiagnosticRequest, MergeOutcome, NativeCode, ResolveError, ResolveResult,
    RunSummary, StashId, Subsystem,
};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Read-only inputs shared by every request of a run.
pub struct Catalogs {
    pub mappings: MappingCatalog,
    pub reference: RoseConfig,
    pub stashmaster: StashMaster,
    /// NEMO field definitions.
    pub ocean_fields: XmlTree,
    pub ice_fields: IceFieldList,
}

/// The three site stores a run rewrites.
pub struct SiteStores {
    pub atmosphere: RoseConfig,
    pub ocean: XmlTree,
    pub ice: RoseConfig,
}

/// Stores after a run, with what the run did to them.
pub struct RunOutput {
    pub stores: SiteStores,
    pub summary: RunSummary,
    /// Atmosphere codes a request record was added for.
    pub added_codes: Vec<StashId>,
}

pub struct Engine<'a> {
    catalogs: &'a Catalogs,
    atmosphere: AtmosphereAdapter<'a>,
    ocean: OceanAdapter<'a>,
    ice: IceAdapter<'a>,
    summary: RunSummary,
}

impl<'a> Engine<'a> {
    pub fn new(catalogs: &'a Catalogs, policy: &'a Policy, stores: SiteStores) -> Self {
        let resolver = CompatibilityResolver::new(
            stores.atmosphere,
            &catalogs.reference,
            &catalogs.stashmaster,
            policy,
        );
        Self {
            catalogs,
            atmosphere: AtmosphereAdapter::new(resolver),
            ocean: OceanAdapter::new(stores.ocean, &catalogs.ocean_fields),
            ice: IceAdapter::new(stores.ice, &catalogs.ice_fields),
            summary: RunSummary::new(),
        }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Resolves every request in order. Stops at the first fatal error.
    pub fn run(&mut self, requests: &[DiagnosticRequest]) -> ResolveResult<()> {
        for request in requests {
            info!(request = %request, "resolving");
            self.resolve(request)?;
        }
        info!(
            added = self.summary.total_added(),
            missing = self.summary.total_missing(),
            already_present = self.summary.already_present(),
            "run complete"
        );
        Ok(())
    }

    /// Resolves one request; per-diagnostic failures land in the summary.
    pub fn resolve(&mut self, request: &DiagnosticRequest) -> ResolveResult<()> {
        let mut path = Vec::new();
        match self.expand(request, &mut path) {
            Err(e) if !e.is_fatal() => {
                warn!(request = %request, error = %e, "diagnostic not resolved");
                self.summary
                    .record(realm_subsystem(&request.realm), MergeOutcome::Missing, &request.variable);
                Ok(())
            }
            other => other,
        }
    }

    fn expand(&mut self, request: &DiagnosticRequest, path: &mut Vec<String>) -> ResolveResult<()> {
        let name = request.variable.as_str();
        let catalogs = self.catalogs;
        let Some(mapping) = catalogs.mappings.get(name) else {
            return self.resolve_native(request);
        };

        let expansion = resolve_expression(name, &mapping.expression)?;
        if expansion.terminal {
            return self.resolve_native(request);
        }
        if let Some(dimension) = &mapping.dimension {
            if dimension.trim() != request.domain.to_string() {
                debug!(variable = name, mapped = %dimension, requested = %request.domain, "mapping dimension differs from the request");
            }
        }

        for code in &expansion.codes {
            self.merge_atmosphere(code, request)?;
        }

        path.push(name.to_string());
        let result = self.expand_residuals(request, &expansion.residuals, path);
        path.pop();
        result
    }

    fn expand_residuals(
        &mut self,
        request: &DiagnosticRequest,
        residuals: &BTreeSet<String>,
        path: &mut Vec<String>,
    ) -> ResolveResult<()> {
        let name = request.variable.as_str();
        let catalogs = self.catalogs;
        for residual in residuals {
            if catalogs
                .mappings
                .get(residual)
                .is_some_and(|m| m.is_fixed_field())
            {
                debug!(variable = %residual, "skipping fixed field");
                continue;
            }
            if residual == name {
                self.resolve_native(request)?;
            } else if path.contains(residual) {
                warn!(variable = %residual, via = name, "mapping cycle; not expanding again");
            } else {
                let sub = request.for_variable(residual);
                match self.expand(&sub, path) {
                    Err(e) if !e.is_fatal() => {
                        warn!(variable = %residual, via = name, error = %e, "sub-diagnostic not resolved");
                        self.summary
                            .record(realm_subsystem(&request.realm), MergeOutcome::Missing, residual);
                    }
                    other => other?,
                }
            }
        }
        Ok(())
    }

    fn merge_atmosphere(&mut self, code: &AtmosphereCode, request: &DiagnosticRequest) -> ResolveResult<()> {
        self.merge(&NativeCode::Atmosphere(code.clone()), request)
    }

    /// Ice first, then ocean; anything neither knows is missing.
    fn resolve_native(&mut self, request: &DiagnosticRequest) -> ResolveResult<()> {
        let name = request.variable.clone();
        let code = if self.ice.knows(&name) {
            NativeCode::IceField(name)
        } else {
            NativeCode::OceanField(name)
        };
        self.merge(&code, request)
    }

    /// Hands `code` to the adapter of its subsystem and records the outcome.
    fn merge(&mut self, code: &NativeCode, request: &DiagnosticRequest) -> ResolveResult<()> {
        let (subsystem, outcome, label) = match code {
            NativeCode::Atmosphere(code) => (
                self.atmosphere.subsystem(),
                self.atmosphere.ensure_present(code, request)?,
                code.id.to_string(),
            ),
            NativeCode::IceField(name) => (
                self.ice.subsystem(),
                self.ice.ensure_present(name, request)?,
                ice::field_name(name),
            ),
            NativeCode::OceanField(name) => (
                self.ocean.subsystem(),
                self.ocean.ensure_present(name, request)?,
                name.clone(),
            ),
        };
        if outcome == MergeOutcome::Missing {
            return Err(ResolveError::UnknownDiagnostic {
                name: request.variable.clone(),
            });
        }
        debug!(code = %code, outcome = ?outcome, "merged");
        self.summary.record(subsystem, outcome, &label);
        Ok(())
    }

    pub fn finish(self) -> RunOutput {
        let added_codes = self.atmosphere.added().to_vec();
        RunOutput {
            stores: SiteStores {
                atmosphere: self.atmosphere.into_store(),
                ocean: self.ocean.into_tree(),
                ice: self.ice.into_store(),
            },
            summary: self.summary,
            added_codes,
        }
    }
}

/// Subsystem a request's realm points at; ocean when it says nothing useful.
pub fn realm_subsystem(realm: &str) -> Subsystem {
    let realm = realm.trim().to_ascii_lowercase();
    if realm.starts_with("atmos") || realm.starts_with("land") || realm.starts_with("aerosol") {
        Subsystem::Atmosphere
    } else if realm.starts_with("seaice") {
        Subsystem::Ice
    } else {
        Subsystem::Ocean
    }
}
