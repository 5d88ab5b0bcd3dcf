use std::io;
use std::path::Path;

use super::{AccessMode, PrivilegeGate, ServiceIdentity};

/// Gate for platforms without POSIX credentials: no service account and no
/// elevation.
#[derive(Debug)]
pub struct SystemPrivilegeGate {
    service_account: String,
}

impl SystemPrivilegeGate {
    pub fn new(service_account: impl Into<String>) -> Self {
        Self {
            service_account: service_account.into(),
        }
    }
}

impl PrivilegeGate for SystemPrivilegeGate {
    fn lookup_service_identity(&self) -> Option<ServiceIdentity> {
        log::trace!("Service account {} is not looked up on this platform", self.service_account);
        None
    }

    fn escalate(&self) -> bool {
        false
    }

    fn has_access(&self, path: &Path, mode: AccessMode) -> bool {
        match path.metadata() {
            Ok(meta) => !mode.needs_write() || !meta.permissions().readonly(),
            Err(_) => false,
        }
    }

    fn chown_recursive(&self, _path: &Path, _uid: u32, _gid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "ownership changes are only supported on POSIX systems",
        ))
    }
}
