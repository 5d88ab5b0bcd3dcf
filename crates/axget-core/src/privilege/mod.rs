//! Privilege checks for the installer.
//!
//! The gate answers questions and reports success as booleans. Deciding
//! whether a refused elevation is fatal belongs to the caller: the pipeline
//! treats a non-writable destination as an error but only warns when the
//! branding file can't be read or the deployment can't be chowned.

use std::io;
use std::path::Path;

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod other;

#[cfg(unix)]
pub use unix::SystemPrivilegeGate;
#[cfg(not(unix))]
pub use other::SystemPrivilegeGate;

/// Account that should own deployed files (e.g. `tomcat`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
}

/// Kind of access requested by [`PrivilegeGate::has_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub fn needs_read(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    pub fn needs_write(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

pub trait PrivilegeGate {
    /// Look up the service account, if it exists on this system.
    fn lookup_service_identity(&self) -> Option<ServiceIdentity>;

    /// Try to gain elevated privileges. Never fails, only reports.
    fn escalate(&self) -> bool;

    /// Whether the current process may access `path` in `mode`.
    fn has_access(&self, path: &Path, mode: AccessMode) -> bool;

    /// Change the owner of `path` and everything below it.
    fn chown_recursive(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()>;
}
