use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpError;

#[derive(Error, Debug)]
pub enum AxGetError {
    // Destination errors
    #[error("The directory {} does not exist", path.display())]
    DestinationNotFound { path: PathBuf },

    #[error("The directory {} exists, but can't be read and written", path.display())]
    DestinationNotAccessible { path: PathBuf },

    #[error("The path {} already exists", path.display())]
    DestinationAlreadyExists { path: PathBuf },

    // Branding errors
    #[error("The path {} exists, but is not a regular file", path.display())]
    BrandingPathWrongType { path: PathBuf },

    #[error("The provided brand file {} does not exist", path.display())]
    BrandingPathInvalid { path: PathBuf },

    // Input errors
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Download errors
    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    // Extraction errors
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Could not allocate a unique temporary name after {attempts} attempts")]
    NameSpaceExhausted { attempts: usize },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AxGetError {
    /// Process exit code reported by the CLI for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AxGetError::DestinationNotFound { .. } => 1,
            AxGetError::DestinationNotAccessible { .. } => 2,
            AxGetError::BrandingPathWrongType { .. } => 3,
            AxGetError::BrandingPathInvalid { .. } => 4,
            AxGetError::DestinationAlreadyExists { .. } => 5,
            AxGetError::InvalidVersion(_) | AxGetError::Config(_) => 6,
            AxGetError::Download { .. } | AxGetError::Http(_) => 7,
            AxGetError::Extraction(_) => 8,
            AxGetError::NameSpaceExhausted { .. } | AxGetError::Io(_) => 9,
        }
    }
}

pub type Result<T> = std::result::Result<T, AxGetError>;
