//! # diagmerge store - backing store formats
//!
//! Loaders and writers for everything a run reads or rewrites:
//!
//! - **rose**: `key=value` section files (site stores, reference catalog, ice namelists)
//! - **mappings**: the CF-to-native mapping catalog
//! - **xml**: element trees for the ocean request file and field definitions
//! - **stashmaster**: per-code level and pseudo-level facts
//! - **cice**: the ice history field list
//! - **requests**: the CSV request list
//! - **suite**: where each store lives inside a rose suite
//!
//! Stores are plain in-memory values; nothing is written until `save` is called.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod cice;
pub mod error;
pub mod mappings;
pub mod requests;
pub mod rose;
pub mod stashmaster;
pub mod suite;
pub mod xml;

pub use cice::IceFieldList;
pub use error::{StoreError, StoreResult};
pub use mappings::{Mapping, MappingCatalog};
pub use requests::{load_requests, read_requests};
pub use rose::RoseConfig;
pub use stashmaster::StashMaster;
pub use suite::SuiteLayout;
pub use xml::{NodeId, NodeKind, XmlTree};
