//! Collision-free temporary names inside the destination root.
//!
//! Every name handed out during a run is reserved the moment it is minted,
//! so two artifacts of the same run never share a basename and no name ever
//! shadows an entry that existed before the run started.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

use crate::{AxGetError, Result};

/// Upper bound on candidates tried before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 10_000;

const NAME_PREFIX: &str = ".axget-";

/// Produces candidate names. Candidates may repeat; the allocator filters.
pub trait NameSource {
    fn candidate(&mut self) -> OsString;
}

/// Random candidates built from v4 UUIDs.
#[derive(Debug, Default)]
pub struct UuidNameSource;

impl NameSource for UuidNameSource {
    fn candidate(&mut self) -> OsString {
        OsString::from(format!("{}{}", NAME_PREFIX, uuid::Uuid::new_v4().simple()))
    }
}

impl<F> NameSource for F
where
    F: FnMut() -> OsString,
{
    fn candidate(&mut self) -> OsString {
        self()
    }
}

pub struct NameAllocator {
    taken: HashSet<OsString>,
    source: Box<dyn NameSource>,
}

impl NameAllocator {
    /// Record every entry of `target_dir` and return an allocator using
    /// random names.
    pub fn initialize(target_dir: &Path) -> Result<Self> {
        Self::with_source(target_dir, Box::new(UuidNameSource))
    }

    /// Like [`NameAllocator::initialize`] with a custom candidate source.
    pub fn with_source(target_dir: &Path, source: Box<dyn NameSource>) -> Result<Self> {
        let mut taken = HashSet::new();
        for entry in fs::read_dir(target_dir)? {
            taken.insert(entry?.file_name());
        }

        log::debug!(
            "Name registry initialized with {} entries from {}",
            taken.len(),
            target_dir.display()
        );

        Ok(Self { taken, source })
    }

    /// Mint a name that is not in the registry and reserve it.
    pub fn allocate(&mut self) -> Result<OsString> {
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let name = self.source.candidate();
            if self.taken.insert(name.clone()) {
                return Ok(name);
            }
            log::trace!("Temporary name {:?} taken (attempt {})", name, attempt);
        }

        Err(AxGetError::NameSpaceExhausted {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }

    /// Whether `name` is already known to the registry.
    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(&OsString::from(name))
    }

    /// Number of reserved names, pre-existing entries included.
    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}
