//! Domain, time and usage compatibility for atmosphere codes.
//!
//! The resolver owns the site atmosphere store while a run is in progress.
//! Whenever the site lacks a profile that the reference catalog or the
//! operator's policy can supply, a copy is written into the site under a
//! fingerprint-derived name, so repeated runs converge on the same sections.

use crate::domain;
use crate::policy::Policy;
use crate::tables::{self, Coercion};
use crate::usage::{self, UseMatrix};
use diagmerge_store::{RoseConfig, StashMaster};
use diagmerge_types::{
    Attributes, AtmosphereCode, ConfigEntry, DomainDescriptor, EntryKind, Fingerprint,
    FrequencyClass, LevelFacts, LevelType, ResolveError, ResolveResult, StashFlavor,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Domain chosen for a code, with the descriptor it was chosen for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainChoice {
    pub label: String,
    /// The requested descriptor after any level coercion.
    pub descriptor: DomainDescriptor,
}

pub struct CompatibilityResolver<'a> {
    site: RoseConfig,
    reference: &'a RoseConfig,
    stashmaster: &'a StashMaster,
    policy: &'a Policy,
    matrix: UseMatrix,
    /// `frequency_ityp` to time label.
    time_labels: HashMap<String, String>,
    /// Domain labels known to be present in the site.
    domain_labels: HashSet<String>,
    /// Time label to the usage the reference pairs it with.
    usage_hints: HashMap<String, String>,
}

impl<'a> CompatibilityResolver<'a> {
    pub fn new(
        site: RoseConfig,
        reference: &'a RoseConfig,
        stashmaster: &'a StashMaster,
        policy: &'a Policy,
    ) -> Self {
        let matrix = UseMatrix::from_store(&site);
        Self {
            site,
            reference,
            stashmaster,
            policy,
            matrix,
            time_labels: HashMap::new(),
            domain_labels: HashSet::new(),
            usage_hints: HashMap::new(),
        }
    }

    pub fn site(&self) -> &RoseConfig {
        &self.site
    }

    pub fn site_mut(&mut self) -> &mut RoseConfig {
        &mut self.site
    }

    pub fn into_site(self) -> RoseConfig {
        self.site
    }

    pub fn matrix(&self) -> &UseMatrix {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut UseMatrix {
        &mut self.matrix
    }

    pub fn policy(&self) -> &Policy {
        self.policy
    }

    pub fn facts(&self, code: &AtmosphereCode) -> ResolveResult<&'a LevelFacts> {
        let stashmaster: &'a StashMaster = self.stashmaster;
        stashmaster.facts(&code.id).ok_or_else(|| {
            ResolveError::Store(format!("STASHmaster has no record for {}", code.id))
        })
    }

    // ---- Domains ----

    /// Domain label for `code` requested over `descriptor`.
    pub fn resolve_domain(
        &mut self,
        code: &AtmosphereCode,
        descriptor: &DomainDescriptor,
    ) -> ResolveResult<DomainChoice> {
        let id = code.id.to_string();
        if let Some(label) = self.policy.domain_overrides.get(&id) {
            let label = label.clone();
            self.ensure_domain_label(&label)?;
            debug!(code = %id, domain = %label, "domain pinned by configuration");
            return Ok(DomainChoice {
                label,
                descriptor: descriptor.clone(),
            });
        }

        let facts = self.facts(code)?;
        let mut descriptor = descriptor.clone();
        let mut label = self.descriptor_domain(&descriptor)?;

        let domain_level = self.site_level(&label)?;
        if domain_level != facts.level_type {
            match tables::coerce(domain_level, facts.level_type) {
                Some(Coercion::Accept(note)) => {
                    warn!(code = %id, domain = %label, "{}", note);
                }
                Some(Coercion::Switch(target)) => {
                    descriptor = DomainDescriptor::parse(target);
                    let switched = self.descriptor_domain(&descriptor)?;
                    info!(code = %id, from = %label, to = %switched, "switching output domain");
                    label = switched;
                }
                Some(Coercion::Extend(token)) => {
                    descriptor = descriptor.with_token(token);
                    let switched = self.descriptor_domain(&descriptor)?;
                    info!(code = %id, from = %label, to = %switched, "switching output domain");
                    label = switched;
                }
                None => {
                    return Err(ResolveError::AmbiguousLevelPairing {
                        code: id,
                        domain: label,
                        domain_level: domain_level.code(),
                        code_level: facts.level_type.code(),
                    })
                }
            }
        }

        if facts.has_pseudo_levels() {
            label = self.pseudo_domain(code, facts)?;
        }

        Ok(DomainChoice { label, descriptor })
    }

    fn descriptor_domain(&mut self, descriptor: &DomainDescriptor) -> ResolveResult<String> {
        let label = self
            .policy
            .descriptors
            .label_for(descriptor)
            .ok_or_else(|| ResolveError::UnknownDescriptor {
                descriptor: descriptor.to_string(),
            })?
            .to_string();
        self.ensure_domain_label(&label)?;
        Ok(label)
    }

    fn site_level(&self, label: &str) -> ResolveResult<LevelType> {
        let entry = domain::find_by_label(&self.site, label)
            .ok_or_else(|| ResolveError::UndefinedDomain {
                label: label.to_string(),
            })?;
        domain::level_of(entry)
    }

    /// Makes sure the site defines a domain labelled `label`, copying the
    /// reference or a user-supplied profile in when it does not.
    fn ensure_domain_label(&mut self, label: &str) -> ResolveResult<()> {
        if self.domain_labels.contains(label) {
            return Ok(());
        }
        let reference: &'a RoseConfig = self.reference;
        let policy: &'a Policy = self.policy;

        if let Some(profile) = domain::find_by_label(reference, label) {
            if domain::find_equivalent(&self.site, &profile.attributes).is_none() {
                if domain::find_by_label(&self.site, label).is_some() {
                    warn!(domain = %label, "site profile differs from the reference; keeping the site's");
                } else {
                    let name = self.copy_in(profile, profile.attributes.clone());
                    info!(domain = %label, section = %name, "added domain profile from reference");
                }
            }
        } else if domain::find_by_label(&self.site, label).is_none() {
            let profile = policy
                .user_domains
                .iter()
                .find(|entry| entry.label() == Some(label))
                .ok_or_else(|| ResolveError::UndefinedDomain {
                    label: label.to_string(),
                })?;
            let name = self.copy_in(profile, profile.attributes.clone());
            info!(domain = %label, section = %name, "added user domain profile");
        }

        self.domain_labels.insert(label.to_string());
        Ok(())
    }

    fn pseudo_domain(&mut self, code: &AtmosphereCode, facts: &LevelFacts) -> ResolveResult<String> {
        if let Some(label) = domain::find_pseudo_domain(&self.site, facts).and_then(ConfigEntry::label) {
            return Ok(label.to_string());
        }
        let reference: &'a RoseConfig = self.reference;
        let profile = domain::find_pseudo_domain(reference, facts).ok_or_else(|| {
            ResolveError::UndefinedPseudoLevelRange {
                code: code.id.to_string(),
                pseudo_type: facts.pseudo_type,
                first: facts.pseudo_first,
                last: facts.pseudo_last,
                level: facts.level_type.code(),
            }
        })?;
        let label = profile
            .label()
            .ok_or_else(|| ResolveError::Store(format!("{} has no dom_name", profile.name)))?
            .to_string();
        if domain::find_by_label(&self.site, &label).is_some() {
            warn!(domain = %label, "site already uses this label for another pseudo-level range");
        }
        let name = self.copy_in(profile, profile.attributes.clone());
        info!(code = %code.id, domain = %label, section = %name, "added pseudo-level domain from reference");
        self.domain_labels.insert(label.clone());
        Ok(label)
    }

    // ---- Times ----

    /// Time label sampling `frequency` with the processing of `code`.
    pub fn resolve_time(
        &mut self,
        frequency: &FrequencyClass,
        code: &AtmosphereCode,
    ) -> ResolveResult<String> {
        let lbproc = code.processing().unwrap_or(tables::DEFAULT_LBPROC);
        let ityp = tables::time_operation(lbproc).ok_or_else(|| {
            ResolveError::UnsupportedProcessing {
                code: code.id.to_string(),
                lbproc: lbproc.to_string(),
            }
        })?;
        let key = format!("{}_{}", frequency, ityp);
        if let Some(label) = self.time_labels.get(&key) {
            return Ok(label.clone());
        }

        let mut filter = tables::frequency_filter(frequency.as_str()).ok_or_else(|| {
            ResolveError::UnknownFrequency {
                frequency: frequency.to_string(),
                context: "atmosphere time profiles".to_string(),
            }
        })?;
        if !filter.contains_key("ityp") {
            filter.insert("ityp", ityp);
        }
        let canonical = tables::canonical_time_label(frequency.as_str());

        let site_candidates = usage::matching_time_profiles(&self.site, &filter);
        let label = match usage::choose_time_profile(&site_candidates, canonical) {
            Some(entry) => entry
                .label()
                .ok_or_else(|| ResolveError::Store(format!("{} has no tim_name", entry.name)))?
                .to_string(),
            None => self.copy_time_profile(frequency, &filter, canonical, code)?,
        };

        debug!(frequency = %frequency, ityp, time = %label, "time profile resolved");
        self.time_labels.insert(key, label.clone());
        Ok(label)
    }

    fn copy_time_profile(
        &mut self,
        frequency: &FrequencyClass,
        filter: &Attributes,
        canonical: Option<&str>,
        code: &AtmosphereCode,
    ) -> ResolveResult<String> {
        let reference: &'a RoseConfig = self.reference;
        let reference_candidates = usage::matching_time_profiles(reference, filter);
        let profile = usage::choose_time_profile(&reference_candidates, canonical).ok_or_else(|| {
            ResolveError::UnsupportedProcessing {
                code: code.id.to_string(),
                lbproc: format!(
                    "{} (no time profile samples {} with ityp={})",
                    code.processing().unwrap_or(tables::DEFAULT_LBPROC),
                    frequency,
                    filter.get("ityp").unwrap_or_default()
                ),
            }
        })?;
        let label = profile
            .label()
            .ok_or_else(|| ResolveError::Store(format!("{} has no tim_name", profile.name)))?
            .to_string();

        let mut attributes = profile.attributes.clone();
        if self.policy.flavor == StashFlavor::Xios {
            attributes.insert("ts_enabled", ".false.");
        }
        let name = self.copy_in(profile, attributes);
        info!(time = %label, section = %name, "added time profile from reference");

        if let Some(hint) = usage::reference_usage_hint(reference, &label) {
            self.usage_hints.insert(label.clone(), hint);
        }
        Ok(label)
    }

    // ---- Usages ----

    /// Usage for requests on (`time`, `domain`), bound to a stream in the site.
    pub fn resolve_usage(
        &mut self,
        time: &str,
        domain: &str,
        frequency: &FrequencyClass,
    ) -> ResolveResult<String> {
        let usage = self
            .matrix
            .usage_for(time, domain)
            .map(str::to_string)
            .or_else(|| self.policy.default_usage.get(frequency.as_str()).cloned())
            .or_else(|| self.matrix.smallest_for_time(time).map(str::to_string))
            .or_else(|| self.usage_hints.get(time).cloned())
            .ok_or_else(|| ResolveError::UnboundUsage {
                usage: "<none>".to_string(),
                detail: format!("nothing routes time profile {} or frequency {}", time, frequency),
                known_streams: usage::streams(&self.site).into_keys().collect(),
            })?;
        self.ensure_usage_bound(&usage)?;
        Ok(usage)
    }

    /// Makes sure the site has a usage entry for `usage` pointing at a stream,
    /// creating the stream when the operator approved it.
    pub fn ensure_usage_bound(&mut self, usage: &str) -> ResolveResult<()> {
        if usage::usage_labels(&self.site).contains(usage) {
            return Ok(());
        }
        let streams = usage::streams(&self.site);
        let known_streams: Vec<String> = streams.keys().cloned().collect();

        let stream = self
            .policy
            .usage_stream(usage)
            .ok_or_else(|| ResolveError::UnboundUsage {
                usage: usage.to_string(),
                detail: "the usage is not defined in the site and has no [usage] mapping".to_string(),
                known_streams: known_streams.clone(),
            })?
            .to_string();

        if !streams.contains_key(&stream) {
            let mut attributes = self
                .policy
                .approved_streams
                .get(&stream)
                .cloned()
                .ok_or_else(|| ResolveError::UnboundUsage {
                    usage: usage.to_string(),
                    detail: format!(
                        "stream {} neither exists nor is approved in [streams.{}]",
                        stream, stream
                    ),
                    known_streams: known_streams.clone(),
                })?;
            if let Some(base) = attributes.get("filename_base") {
                let base = tables::unquoted(base).to_string();
                let taken: Vec<String> = streams.values().flatten().cloned().collect();
                if taken.contains(&base) {
                    return Err(ResolveError::StreamConflict {
                        stream,
                        filename_base: base,
                        existing: taken,
                    });
                }
            }
            if !attributes.contains_key("file_id") {
                attributes.insert("file_id", tables::quoted(&stream));
            }
            let section = self.policy.stream_section(&stream);
            self.site.insert(ConfigEntry::new(section.clone(), attributes));
            info!(stream = %stream, section = %section, "added output stream");
        }

        let attributes: Attributes = [
            ("file_id", tables::quoted(&stream)),
            ("locn", "3".to_string()),
            ("macrotag", "0".to_string()),
            ("use_name", usage.to_string()),
        ]
        .into_iter()
        .collect();
        let fingerprint = Fingerprint::compute(EntryKind::UsageBinding, &attributes);
        let name = format!(
            "namelist:umstash_use({}_{})",
            tables::unquoted(usage).to_lowercase(),
            fingerprint
        );
        self.site.insert(ConfigEntry::new(name.clone(), attributes));
        info!(usage = %usage, stream = %stream, section = %name, "added usage binding");
        Ok(())
    }

    /// Inserts a copy of `source` carrying `attributes` under its derived name.
    fn copy_in(&mut self, source: &ConfigEntry, attributes: Attributes) -> String {
        let fingerprint = Fingerprint::compute(source.kind(), &attributes);
        let name = source.derived_name(fingerprint.as_str());
        if !self.site.contains(&name) {
            self.site.insert(ConfigEntry::new(name.clone(), attributes));
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "\
[namelist:umstash_domain(diag_11111111)]
dom_name='DIAG'
iopl=5
plt=0

[namelist:umstash_domain(dallth_22222222)]
dom_name='DALLTH'
iopl=2
plt=0

[namelist:umstash_time(tmonmn_33333333)]
ifre=30
ityp=3
tim_name='TMONMN'
unt1=3
unt2=1
unt3=3

[namelist:umstash_use(upm_44444444)]
file_id='xios_upm'
use_name='UPM'

[namelist:xios_streams(xios_upm)]
file_id='xios_upm'
filename_base='$DATAM/${RUNID}a_1m_'

[namelist:umstash_streq(03236_55555555)]
dom_name='DIAG'
isec=3
item=236
package='EXTRA'
tim_name='TMONMN'
use_name='UPM'
";

    const REFERENCE: &str = "\
[namelist:umstash_domain(dallrh_aaaaaaaa)]
dom_name='DALLRH'
iopl=1
plt=0

[namelist:umstash_domain(dsoil_bbbbbbbb)]
dom_name='DSOIL'
iopl=6
plt=0

[namelist:umstash_domain(dtile_cccccccc)]
dom_name='DTILE'
iopl=5
plt=1
pslist=1,2,3,4,5,6,7,8,9

[namelist:umstash_time(tdaymn_dddddddd)]
ifre=1
ityp=3
tim_name='TDAYMN'
unt1=3
unt2=1
unt3=3

[namelist:umstash_streq(03236_eeeeeeee)]
dom_name='DIAG'
isec=3
item=236
tim_name='TDAYMN'
use_name='UPD'
";

    const STASHMASTER: &str = "\
H1| SUBMODEL_NUMBER=1
1|    1 |    0 |    2 |U COMPNT OF WIND AFTER TIMESTEP     |
2|    2 |    0 |    1 |   18 |    1 |    1 |    2 |    0 |    0 |    0 |    0 |
1|    1 |    3 |  236 |TEMPERATURE AT 1.5M                 |
2|    1 |    0 |    1 |    1 |    5 |   -1 |   -1 |    0 |    0 |    0 |    0 |
1|    1 |    3 |  317 |SURFACE TILE FRACTIONS              |
2|    1 |    0 |    1 |    1 |    5 |   -1 |   -1 |    1 |    1 |    9 |    0 |
1|    1 |    8 |  223 |SOIL MOISTURE CONTENT IN A LAYER    |
2|    1 |    0 |    1 |    1 |    6 |    8 |    9 |    0 |    0 |    0 |    0 |
1|    1 |    2 |  207 |DOWNWARD LW RAD FLUX: SURFACE       |
2|    1 |    0 |    1 |    1 |    4 |   -1 |   -1 |    0 |    0 |    0 |    0 |
1|   -1 |   -1 |   -1 |END OF FILE MARK                    |
";

    struct Fixture {
        reference: RoseConfig,
        stashmaster: StashMaster,
        policy: Policy,
    }

    impl Fixture {
        fn new(policy: Policy) -> Self {
            Self {
                reference: RoseConfig::parse("reference.conf", REFERENCE).unwrap(),
                stashmaster: StashMaster::parse("STASHmaster_A", STASHMASTER).unwrap(),
                policy,
            }
        }

        fn resolver(&self) -> CompatibilityResolver<'_> {
            self.resolver_with(SITE)
        }

        fn resolver_with(&self, site: &str) -> CompatibilityResolver<'_> {
            let site = RoseConfig::parse("site.conf", site).unwrap();
            CompatibilityResolver::new(site, &self.reference, &self.stashmaster, &self.policy)
        }
    }

    fn code(text: &str) -> AtmosphereCode {
        text.parse().unwrap()
    }

    #[test]
    fn test_matching_level_keeps_domain() {
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver();
        let choice = resolver
            .resolve_domain(&code("m01s03i236"), &"longitude latitude time".into())
            .unwrap();
        assert_eq!(choice.label, "'DIAG'");
    }

    #[test]
    fn test_rho_code_on_theta_domain_switches_to_half_levels() {
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver();
        let choice = resolver
            .resolve_domain(&code("m01s00i002"), &"longitude latitude alevel time".into())
            .unwrap();
        assert_eq!(choice.label, "'DALLRH'");
        assert!(choice.descriptor.contains("alevhalf"));
        assert!(domain::find_by_label(resolver.site(), "'DALLRH'").is_some());
    }

    #[test]
    fn test_single_level_soil_code_moves_to_soil_domain() {
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver();
        let choice = resolver
            .resolve_domain(&code("m01s08i223"), &"longitude latitude time".into())
            .unwrap();
        assert_eq!(choice.label, "'DSOIL'");
        assert!(choice.descriptor.contains("sdepth"));
    }

    #[test]
    fn test_unlisted_level_pair_is_ambiguous() {
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver();
        let err = resolver
            .resolve_domain(&code("m01s02i207"), &"longitude latitude time".into())
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::AmbiguousLevelPairing {
                domain_level: 5,
                code_level: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_configured_domain_wins() {
        let fixture = Fixture::new(Policy::default().with_domain_override("m01s02i207", "DIAG"));
        let mut resolver = fixture.resolver();
        let choice = resolver
            .resolve_domain(&code("m01s02i207"), &"longitude latitude time".into())
            .unwrap();
        assert_eq!(choice.label, "'DIAG'");
    }

    #[test]
    fn test_pseudo_level_domain_is_copied_from_reference() {
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver();
        let choice = resolver
            .resolve_domain(&code("m01s03i317"), &"longitude latitude time".into())
            .unwrap();
        assert_eq!(choice.label, "'DTILE'");
        let copied = domain::find_by_label(resolver.site(), "'DTILE'").unwrap();
        assert!(copied.name.starts_with("namelist:umstash_domain(dtile_"));
    }

    #[test]
    fn test_rho_code_on_pressure_domain_keeps_the_request() {
        let site = format!(
            "{SITE}\n[namelist:umstash_domain(plev19_66666666)]\ndom_name='PLEV19'\niopl=3\nplt=0\n"
        );
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver_with(&site);
        let before = resolver.site().len();
        let requested: DomainDescriptor = "longitude latitude plev19 time".into();
        let choice = resolver
            .resolve_domain(&code("m01s00i002"), &requested)
            .unwrap();
        assert_eq!(choice.label, "'PLEV19'");
        assert_eq!(choice.descriptor, requested);
        assert_eq!(resolver.site().len(), before);
    }

    #[test]
    fn test_pseudo_level_domain_is_found_in_the_site_first() {
        let site = format!(
            "{SITE}\n[namelist:umstash_domain(dtiles_77777777)]\ndom_name='DTILES'\niopl=5\nplt=1\npslist=1,2,3,4,5,6,7,8,9\n"
        );
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver_with(&site);
        let before = resolver.site().len();
        let choice = resolver
            .resolve_domain(&code("m01s03i317"), &"longitude latitude time".into())
            .unwrap();
        assert_eq!(choice.label, "'DTILES'");
        assert_eq!(resolver.site().len(), before);
        assert!(domain::find_by_label(resolver.site(), "'DTILE'").is_none());
    }

    #[test]
    fn test_unknown_descriptor() {
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver();
        let err = resolver
            .resolve_domain(&code("m01s03i236"), &"longitude latitude olevel time".into())
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownDescriptor { .. }));
    }

    #[test]
    fn test_time_from_site_then_reference() {
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver();
        let monthly = resolver.resolve_time(&"mon".into(), &code("m01s03i236")).unwrap();
        assert_eq!(monthly, "'TMONMN'");

        let before = resolver.site().len();
        let daily = resolver.resolve_time(&"day".into(), &code("m01s03i236")).unwrap();
        assert_eq!(daily, "'TDAYMN'");
        assert_eq!(resolver.site().len(), before + 1);
        let copied = resolver
            .site()
            .enabled(EntryKind::TimeProfile)
            .find(|e| e.label() == Some("'TDAYMN'"))
            .unwrap();
        assert_eq!(copied.get("ts_enabled"), Some(".false."));

        // cached: no second copy
        resolver.resolve_time(&"day".into(), &code("m01s03i236")).unwrap();
        assert_eq!(resolver.site().len(), before + 1);
    }

    #[test]
    fn test_unsupported_processing() {
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver();
        let err = resolver
            .resolve_time(&"mon".into(), &code("m01s03i236[lbproc=64]"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedProcessing { .. }));
    }

    #[test]
    fn test_usage_from_matrix() {
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver();
        let usage = resolver
            .resolve_usage("'TMONMN'", "'DIAG'", &"mon".into())
            .unwrap();
        assert_eq!(usage, "'UPM'");
    }

    #[test]
    fn test_unbound_default_usage_names_the_remedy() {
        let fixture = Fixture::new(Policy::default());
        let mut resolver = fixture.resolver();
        let err = resolver
            .resolve_usage("'TDAYMN'", "'DIAG'", &"day".into())
            .unwrap_err();
        match &err {
            ResolveError::UnboundUsage {
                usage,
                known_streams,
                ..
            } => {
                assert_eq!(usage, "'UPD'");
                assert_eq!(known_streams, &vec!["xios_upm".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.remedy().unwrap().contains("UPD = "));
    }

    #[test]
    fn test_approved_stream_is_created() {
        let stream: Attributes = [
            ("file_id", "'xios_upd'"),
            ("filename_base", "'$DATAM/${RUNID}a_1d_'"),
            ("output_freq", "1"),
        ]
        .into_iter()
        .collect();
        let policy = Policy::default()
            .with_usage_stream("UPD", "xios_upd")
            .with_approved_stream("xios_upd", stream);
        let fixture = Fixture::new(policy);
        let mut resolver = fixture.resolver();
        let usage = resolver
            .resolve_usage("'TDAYMN'", "'DIAG'", &"day".into())
            .unwrap();
        assert_eq!(usage, "'UPD'");
        assert!(resolver.site().contains("namelist:xios_streams(xios_upd)"));
        let binding = resolver
            .site()
            .enabled(EntryKind::UsageBinding)
            .find(|e| e.label() == Some("'UPD'"))
            .unwrap();
        assert!(binding.name.starts_with("namelist:umstash_use(upd_"));
        assert_eq!(binding.get("file_id"), Some("'xios_upd'"));
    }

    #[test]
    fn test_approved_stream_reusing_a_filename_base_conflicts() {
        let stream: Attributes = [("filename_base", "'$DATAM/${RUNID}a_1m_'")]
            .into_iter()
            .collect();
        let policy = Policy::default()
            .with_usage_stream("UPD", "xios_upd")
            .with_approved_stream("xios_upd", stream);
        let fixture = Fixture::new(policy);
        let mut resolver = fixture.resolver();
        let err = resolver.ensure_usage_bound("'UPD'").unwrap_err();
        assert!(matches!(err, ResolveError::StreamConflict { .. }));
    }
}
