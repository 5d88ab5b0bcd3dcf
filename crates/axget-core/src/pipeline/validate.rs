//! Input validation, run before any network or filesystem change.

use std::fs;
use std::path::{Path, PathBuf};

use super::{InstallKind, InstallObserver, InstallRequest};
use crate::config::Config;
use crate::privilege::{AccessMode, PrivilegeGate, ServiceIdentity};
use crate::{AxGetError, Result};

/// Everything a run decides up front, threaded through the later stages.
#[derive(Debug)]
pub(crate) struct RunContext {
    /// Absolute destination root
    pub dest_root: PathBuf,
    /// Absolute final tree path; does not exist yet
    pub final_dir: PathBuf,
    /// Logo to copy, if branding is enabled for this run
    pub brand_file: Option<PathBuf>,
    /// Account to chown the final tree to, if eligible
    pub owner: Option<ServiceIdentity>,
    pub warnings: Vec<String>,
}

impl RunContext {
    pub fn validate(
        config: &Config,
        request: &InstallRequest,
        gate: &dyn PrivilegeGate,
        observer: &dyn InstallObserver,
    ) -> Result<Self> {
        let dest_root = check_destination(&request.out_dir, gate)?;
        let final_dir = dest_root.join(request.kind.folder_name(config, &request.version));

        let mut ctx = Self {
            dest_root,
            final_dir,
            brand_file: None,
            owner: None,
            warnings: Vec::new(),
        };

        ctx.brand_file = ctx.resolve_branding(config, request, gate, observer)?;

        if request.kind == InstallKind::Binary {
            ctx.owner = ctx.resolve_owner(gate, observer);
        }

        if ctx.final_dir.symlink_metadata().is_ok() {
            return Err(AxGetError::DestinationAlreadyExists {
                path: ctx.final_dir.clone(),
            });
        }

        log::debug!(
            "Validated {} install of {} into {}",
            request.kind.as_str(),
            request.version,
            ctx.final_dir.display()
        );
        Ok(ctx)
    }

    pub fn warn(&mut self, observer: &dyn InstallObserver, message: String) {
        log::warn!("{}", message);
        observer.warning(&message);
        self.warnings.push(message);
    }

    fn resolve_branding(
        &mut self,
        config: &Config,
        request: &InstallRequest,
        gate: &dyn PrivilegeGate,
        observer: &dyn InstallObserver,
    ) -> Result<Option<PathBuf>> {
        let default_path = self.dest_root.join(&config.default_brand_file);
        let brand_file = match &request.brand_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.dest_root.join(path),
            None => default_path.clone(),
        };

        let is_regular_file = fs::symlink_metadata(&brand_file)
            .map(|meta| meta.file_type().is_file())
            .unwrap_or(false);

        if !is_regular_file {
            if brand_file == default_path {
                log::debug!("No branding logo at {}, skipping branding", brand_file.display());
                return Ok(None);
            }
            if brand_file.symlink_metadata().is_ok() {
                return Err(AxGetError::BrandingPathWrongType { path: brand_file });
            }
            return Err(AxGetError::BrandingPathInvalid { path: brand_file });
        }

        if !gate.has_access(&brand_file, AccessMode::Read)
            && !(gate.escalate() && gate.has_access(&brand_file, AccessMode::Read))
        {
            self.warn(
                observer,
                format!(
                    "Cannot read {}. The branding logo will not be copied.",
                    brand_file.display()
                ),
            );
            return Ok(None);
        }

        Ok(Some(brand_file))
    }

    fn resolve_owner(
        &mut self,
        gate: &dyn PrivilegeGate,
        observer: &dyn InstallObserver,
    ) -> Option<ServiceIdentity> {
        let identity = gate.lookup_service_identity()?;

        if gate.escalate() {
            log::debug!(
                "Deployment will be owned by {} ({}:{})",
                identity.name,
                identity.uid,
                identity.gid
            );
            Some(identity)
        } else {
            self.warn(
                observer,
                format!(
                    "Downloaded content cannot be chowned to {} without elevated privileges. Ownership repair will be skipped.",
                    identity.name
                ),
            );
            None
        }
    }
}

/// The destination must exist; read and write access may be obtained by
/// escalating.
fn check_destination(out_dir: &Path, gate: &dyn PrivilegeGate) -> Result<PathBuf> {
    if !out_dir.is_dir() {
        return Err(AxGetError::DestinationNotFound {
            path: out_dir.to_path_buf(),
        });
    }

    if !gate.has_access(out_dir, AccessMode::ReadWrite)
        && !(gate.escalate() && gate.has_access(out_dir, AccessMode::ReadWrite))
    {
        return Err(AxGetError::DestinationNotAccessible {
            path: out_dir.to_path_buf(),
        });
    }

    Ok(fs::canonicalize(out_dir)?)
}
