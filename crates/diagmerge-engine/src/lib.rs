//! # diagmerge engine - diagnostic resolution
//!
//! Turns CF diagnostic requests into edits of the three site stores.
//!
//! ## Key Concepts
//!
//! - **Expansion**: a mapping expression names atmosphere codes and further
//!   CF sub-diagnostics; expansion recurses until only native codes remain
//! - **Compatibility**: an atmosphere code needs a domain whose level type it
//!   can be output on, a time profile for its frequency and processing, and a
//!   usage bound to an output stream
//! - **Adapters**: one per subsystem; each makes sure a native code is output
//!   by its store and reports whether anything changed
//! - **Convergence**: profiles copied into a site are named by content
//!   fingerprint, so a second run over its own output adds nothing
//!
//! ## Example
//!
//! ```ignore
//! let mut engine = Engine::new(&catalogs, &policy, stores);
//! engine.run(&requests)?;
//! let output = engine.finish();
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod adapters;
pub mod compat;
pub mod domain;
pub mod driver;
pub mod expression;
pub mod policy;
pub mod tables;
pub mod usage;

pub use adapters::{AtmosphereAdapter, IceAdapter, MergeAdapter, OceanAdapter};
pub use compat::{CompatibilityResolver, DomainChoice};
pub use driver::{Catalogs, Engine, RunOutput, SiteStores};
pub use expression::{resolve_expression, Expansion};
pub use policy::Policy;
pub use tables::DescriptorTable;
pub use usage::UseMatrix;
