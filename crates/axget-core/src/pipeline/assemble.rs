//! Moving extracted trees into their final place.
//!
//! The nested module rename needs the outer folder to exist under its final
//! name. [`AssembledRoot`] can only be obtained from the outer rename (or the
//! creation of an empty final directory), so [`AssembledRoot::nest`] can
//! never run before it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{AxGetError, Result};

/// A final tree that exists at its destination path.
#[derive(Debug)]
pub struct AssembledRoot {
    path: PathBuf,
}

impl AssembledRoot {
    /// Rename the staged directory to `final_dir`, which must not exist.
    pub fn claim(staged: &Path, final_dir: &Path) -> Result<Self> {
        // rename(2) silently replaces an empty directory, so check first
        if final_dir.symlink_metadata().is_ok() {
            return Err(AxGetError::DestinationAlreadyExists {
                path: final_dir.to_path_buf(),
            });
        }

        fs::rename(staged, final_dir)?;
        log::debug!("Renamed {} to {}", staged.display(), final_dir.display());

        Ok(Self {
            path: final_dir.to_path_buf(),
        })
    }

    /// Create `final_dir` as a new empty directory. Fails with
    /// [`AxGetError::DestinationAlreadyExists`] if anything is already there;
    /// existing content is never removed.
    pub fn create(final_dir: &Path) -> Result<Self> {
        match fs::create_dir(final_dir) {
            Ok(()) => Ok(Self {
                path: final_dir.to_path_buf(),
            }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(AxGetError::DestinationAlreadyExists {
                    path: final_dir.to_path_buf(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Move `staged` to `relative` inside this tree and return the new path.
    ///
    /// Missing parents are created. An empty directory at the target (a
    /// placeholder such as an unpopulated git submodule) is replaced; any
    /// other existing entry is an error.
    pub fn nest(&self, staged: &Path, relative: &Path) -> Result<PathBuf> {
        let target = self.path.join(relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        if let Ok(meta) = target.symlink_metadata() {
            let is_empty_dir = meta.is_dir() && fs::read_dir(&target)?.next().is_none();
            if !is_empty_dir {
                return Err(AxGetError::DestinationAlreadyExists { path: target });
            }
            fs::remove_dir(&target)?;
        }

        fs::rename(staged, &target)?;
        log::debug!("Renamed {} to {}", staged.display(), target.display());
        Ok(target)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}
