use std::cell::Cell;
use std::io;
use std::os::unix::fs::lchown;
use std::path::Path;

use nix::unistd::{self, AccessFlags, Group, Uid, User};
use walkdir::WalkDir;

use super::{AccessMode, PrivilegeGate, ServiceIdentity};

/// Gate backed by the real process credentials.
///
/// Elevation switches the effective uid to root at most once per gate; later
/// calls return the remembered outcome.
#[derive(Debug)]
pub struct SystemPrivilegeGate {
    service_account: String,
    escalated: Cell<Option<bool>>,
}

impl SystemPrivilegeGate {
    pub fn new(service_account: impl Into<String>) -> Self {
        Self {
            service_account: service_account.into(),
            escalated: Cell::new(None),
        }
    }

    fn try_escalate() -> bool {
        if unistd::geteuid().is_root() {
            return true;
        }

        // Works for setuid binaries and processes started by root that
        // dropped their effective uid.
        match unistd::seteuid(Uid::from_raw(0)) {
            Ok(()) => {
                log::debug!("Effective uid switched to root");
                true
            }
            Err(e) => {
                log::debug!("Could not switch effective uid to root: {}", e);
                false
            }
        }
    }
}

impl PrivilegeGate for SystemPrivilegeGate {
    fn lookup_service_identity(&self) -> Option<ServiceIdentity> {
        let user = match User::from_name(&self.service_account) {
            Ok(Some(user)) => user,
            Ok(None) => return None,
            Err(e) => {
                log::debug!("Looking up user {} failed: {}", self.service_account, e);
                return None;
            }
        };

        // Prefer a group named after the account over the user's primary group
        let gid = match Group::from_name(&self.service_account) {
            Ok(Some(group)) => group.gid,
            _ => user.gid,
        };

        Some(ServiceIdentity {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: gid.as_raw(),
        })
    }

    fn escalate(&self) -> bool {
        if let Some(done) = self.escalated.get() {
            return done;
        }
        let outcome = Self::try_escalate();
        self.escalated.set(Some(outcome));
        outcome
    }

    fn has_access(&self, path: &Path, mode: AccessMode) -> bool {
        // access(2) checks the real uid, which stays unprivileged after seteuid
        if unistd::geteuid().is_root() {
            return path.symlink_metadata().is_ok();
        }

        let mut flags = AccessFlags::empty();
        if mode.needs_read() {
            flags |= AccessFlags::R_OK;
        }
        if mode.needs_write() {
            flags |= AccessFlags::W_OK;
        }

        unistd::access(path, flags).is_ok()
    }

    fn chown_recursive(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        let mut changed = 0usize;
        for entry in WalkDir::new(path).follow_links(false) {
            let entry = entry?;
            lchown(entry.path(), Some(uid), Some(gid))?;
            changed += 1;
        }

        log::debug!("Changed ownership of {} entries under {}", changed, path.display());
        Ok(())
    }
}
