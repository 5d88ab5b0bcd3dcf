//! Release version handling.

use std::fmt;

use crate::{AxGetError, Result};

/// A release version given as three components.
///
/// Components are kept verbatim: no numeric validation happens, so
/// pre-release tags such as `0-rc1` pass through into URLs and folder names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    major: String,
    minor: String,
    patch: String,
}

impl Version {
    pub fn new(
        major: impl Into<String>,
        minor: impl Into<String>,
        patch: impl Into<String>,
    ) -> Result<Self> {
        let version = Self {
            major: major.into(),
            minor: minor.into(),
            patch: patch.into(),
        };

        for (label, value) in [
            ("major", &version.major),
            ("minor", &version.minor),
            ("patch", &version.patch),
        ] {
            if value.is_empty() {
                return Err(AxGetError::InvalidVersion(format!(
                    "the {} component is empty",
                    label
                )));
            }
        }

        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
