//! Resolution error taxonomy.
//!
//! Two kinds of failure exist. Per-diagnostic failures (`UnknownDiagnostic`,
//! `MalformedExpression`) are recorded in the run summary and resolution
//! moves on. Everything else is a structural gap in the inputs: the run
//! aborts and [`ResolveError::remedy`] tells the operator what to add.

use thiserror::Error;

/// Errors raised while resolving a diagnostic request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No mapping and no native definition anywhere.
    #[error("unknown diagnostic: {name}")]
    UnknownDiagnostic { name: String },

    /// Mapping text matches none of the recognised token shapes.
    #[error("malformed expression for {name}: {detail}")]
    MalformedExpression { name: String, detail: String },

    /// The level-coercion table has no rule for this pair.
    #[error(
        "no level rule for {code}: domain {domain} is on level type {domain_level} \
         but the code is output on level type {code_level}"
    )]
    AmbiguousLevelPairing {
        code: String,
        domain: String,
        domain_level: i64,
        code_level: i64,
    },

    /// No site or reference domain covers the code's pseudo-level range.
    #[error(
        "no domain with pseudo-level type {pseudo_type} covering {first}..={last} \
         on level type {level} for {code}"
    )]
    UndefinedPseudoLevelRange {
        code: String,
        pseudo_type: i64,
        first: i64,
        last: i64,
        level: i64,
    },

    /// A usage has no stream binding and none can be synthesised.
    #[error("usage {usage} has no stream binding: {detail}")]
    UnboundUsage {
        usage: String,
        detail: String,
        known_streams: Vec<String>,
    },

    /// Every slot of the ice frequency schedule is taken.
    #[error("no free histfreq slot for {marker} (needed by {field})")]
    ScheduleExhausted { field: String, marker: String },

    /// A domain label that neither the site, the reference nor the
    /// operator's user domains define.
    #[error("no domain profile labelled {label}")]
    UndefinedDomain { label: String },

    /// No domain label is known for a spatial descriptor.
    #[error("no domain label for descriptor [{descriptor}]")]
    UnknownDescriptor { descriptor: String },

    /// A frequency class with no table entry for a subsystem.
    #[error("unknown frequency {frequency} for {context}")]
    UnknownFrequency { frequency: String, context: String },

    /// An `lbproc` value with no time-operation mapping.
    #[error("unsupported processing lbproc={lbproc} on {code}")]
    UnsupportedProcessing { code: String, lbproc: String },

    /// An approved stream reuses an existing stream's filename base.
    #[error("stream {stream} reuses filename base {filename_base}")]
    StreamConflict {
        stream: String,
        filename_base: String,
        existing: Vec<String>,
    },

    /// A recognised ice field that the namelist does not declare.
    #[error("{field} is a known ice field but is absent from namelist:icefields_nml")]
    UnlistedIceField { field: String },

    /// The ocean request tree lacks a node needed to attach a field.
    #[error("ocean request tree has no {what}")]
    MissingTemplate { what: String },

    /// A backing store violates its own schema.
    #[error("store inconsistency: {0}")]
    Store(String),
}

impl ResolveError {
    /// Whether this error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ResolveError::UnknownDiagnostic { .. } | ResolveError::MalformedExpression { .. }
        )
    }

    /// Configuration the operator must supply before re-running, if any.
    pub fn remedy(&self) -> Option<String> {
        match self {
            ResolveError::UnknownDiagnostic { .. } | ResolveError::MalformedExpression { .. } => {
                None
            }
            ResolveError::AmbiguousLevelPairing { code, .. } => Some(format!(
                "choose a domain for {code} and add it to the run configuration:\n\n\
                 [domains]\n{code} = \"'<domain label>'\"\n"
            )),
            ResolveError::UndefinedPseudoLevelRange {
                code,
                pseudo_type,
                first,
                last,
                ..
            } => Some(format!(
                "define a domain with plt={pseudo_type} and pslist covering {first}..{last}, \
                 or map {code} to an existing one:\n\n\
                 [domains]\n{code} = \"'<domain label>'\"\n"
            )),
            ResolveError::UnboundUsage {
                usage,
                known_streams,
                ..
            } => {
                let label = usage.trim_matches('\'');
                let mut text = format!(
                    "map the usage to an output stream:\n\n[usage]\n{label} = \"<stream id>\"\n"
                );
                if !known_streams.is_empty() {
                    text.push_str("\nexisting streams:\n");
                    for stream in known_streams {
                        text.push_str(&format!("  {stream}\n"));
                    }
                }
                text.push_str(
                    "\nor approve a new stream with a [streams.<stream id>] table holding its attributes\n",
                );
                Some(text)
            }
            ResolveError::ScheduleExhausted { marker, .. } => Some(format!(
                "free a slot (set it to 'x') in histfreq of namelist:setup_nml so {marker} can be scheduled\n"
            )),
            ResolveError::UndefinedDomain { label } => Some(format!(
                "define the domain profile in the run configuration:\n\n\
                 [[user_domains]]\ndom_name = \"{label}\"\niopl = \"<level type>\"\n...\n"
            )),
            ResolveError::UnknownDescriptor { descriptor } => Some(format!(
                "map the descriptor to a domain label:\n\n[descriptors]\n\"{descriptor}\" = \"'<domain label>'\"\n"
            )),
            ResolveError::UnknownFrequency { frequency, context } => {
                let (table, supported) = match context.as_str() {
                    "atmosphere time profiles" => (
                        "time filter (tables::frequency_filter)",
                        "mon, day, 6hrPt",
                    ),
                    "ice history output" => (
                        "history marker (tables::ice_marker)",
                        "mon, day, hour, 1hr, timestep, year, yr",
                    ),
                    "ocean output" => (
                        "output_freq (tables::ocean_frequency)",
                        "mon, day",
                    ),
                    _ => return None,
                };
                Some(format!(
                    "{frequency} has no {context} {table} in diagmerge-engine; \
                     request one of {supported}, or add {frequency} to that table\n"
                ))
            }
            ResolveError::UnsupportedProcessing { .. } => None,
            ResolveError::StreamConflict {
                stream, existing, ..
            } => Some(format!(
                "change filename_base in [streams.{stream}]; bases already in use: {}\n",
                existing.join(", ")
            )),
            ResolveError::UnlistedIceField { field } => Some(format!(
                "add {field} to namelist:icefields_nml in the ice store\n"
            )),
            ResolveError::MissingTemplate { what } => {
                Some(format!("add a {what} to the ocean request tree by hand\n"))
            }
            ResolveError::Store(_) => None,
        }
    }
}

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_per_diagnostic_errors_are_recoverable() {
        assert!(!ResolveError::UnknownDiagnostic { name: "x".into() }.is_fatal());
        assert!(!ResolveError::MalformedExpression {
            name: "x".into(),
            detail: "y".into()
        }
        .is_fatal());
        assert!(ResolveError::ScheduleExhausted {
            field: "f_aice".into(),
            marker: "'d'".into()
        }
        .is_fatal());
        assert!(ResolveError::Store("bad".into()).is_fatal());
    }

    #[test]
    fn test_unbound_usage_remedy_lists_streams() {
        let err = ResolveError::UnboundUsage {
            usage: "'UPD'".into(),
            detail: "no [usage] mapping".into(),
            known_streams: vec!["xios_upm_1m".into()],
        };
        let remedy = err.remedy().unwrap();
        assert!(remedy.contains("[usage]"));
        assert!(remedy.contains("UPD = "));
        assert!(remedy.contains("xios_upm_1m"));
    }

    #[test]
    fn test_level_pairing_remedy_names_code() {
        let err = ResolveError::AmbiguousLevelPairing {
            code: "m01s16i004".into(),
            domain: "'PLEV19'".into(),
            domain_level: 3,
            code_level: 4,
        };
        assert!(err.to_string().contains("m01s16i004"));
        assert!(err.remedy().unwrap().contains("m01s16i004 = "));
    }

    #[test]
    fn test_unknown_frequency_remedy_names_the_lookup_table() {
        let remedy = |context: &str| {
            ResolveError::UnknownFrequency {
                frequency: "3hr".into(),
                context: context.into(),
            }
            .remedy()
            .unwrap()
        };

        let atmosphere = remedy("atmosphere time profiles");
        assert!(atmosphere.contains("tables::frequency_filter"));
        assert!(atmosphere.contains("6hrPt"));
        let ice = remedy("ice history output");
        assert!(ice.contains("tables::ice_marker"));
        assert!(ice.contains("timestep"));
        let ocean = remedy("ocean output");
        assert!(ocean.contains("tables::ocean_frequency"));
        for text in [atmosphere, ice, ocean] {
            assert!(text.starts_with("3hr has no"));
            assert!(!text.contains("[default_usage]"));
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResolveError>();
    }
}
