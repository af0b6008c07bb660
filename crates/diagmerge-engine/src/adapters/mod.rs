//! Subsystem merge adapters.
//!
//! Each adapter owns one site store for the length of a run and makes sure a
//! native code is produced by it, adding the smallest set of records needed.
//! Calling an adapter twice with the same code changes nothing the second time.

pub mod atmosphere;
pub mod ice;
pub mod ocean;

pub use atmosphere::AtmosphereAdapter;
pub use ice::IceAdapter;
pub use ocean::OceanAdapter;

use diagmerge_types::{DiagnosticRequest, MergeOutcome, ResolveResult, Subsystem};

/// Contract shared by the three adapters.
pub trait MergeAdapter {
    /// Native code this adapter accepts.
    type Code: ?Sized;

    fn subsystem(&self) -> Subsystem;

    /// Ensures `code` is output at the request's frequency over its domain.
    fn ensure_present(
        &mut self,
        code: &Self::Code,
        request: &DiagnosticRequest,
    ) -> ResolveResult<MergeOutcome>;
}
