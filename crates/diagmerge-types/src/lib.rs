//! # diagmerge types - shared data model
//!
//! Types shared by every diagmerge crate. A CF diagnostic request is resolved
//! into native codes for three model subsystems, and the configuration
//! records that make those codes appear in model output are merged into each
//! subsystem's site store.
//!
//! ## Key Concepts
//!
//! - **DiagnosticRequest**: variable name, frequency class and domain descriptor
//! - **NativeCode**: an atmosphere STASH code, an ocean field name or an ice field name
//! - **ConfigEntry**: one named section of a rose configuration store
//! - **Fingerprint**: 8-hex-character content hash of a `ConfigEntry`, display names excluded
//! - **ResolveError**: per-diagnostic and run-level failure taxonomy
//! - **RunSummary**: what was added and what could not be resolved, per subsystem

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod code;
pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod flavor;
pub mod level;
pub mod outcome;
pub mod request;

pub use code::{AtmosphereCode, NativeCode, StashId};
pub use entry::{Attributes, ConfigEntry, EntryKind};
pub use error::{ResolveError, ResolveResult};
pub use fingerprint::Fingerprint;
pub use flavor::StashFlavor;
pub use level::{LevelFacts, LevelType};
pub use outcome::{MergeOutcome, RunSummary, Subsystem};
pub use request::{DiagnosticRequest, DomainDescriptor, FrequencyClass};
