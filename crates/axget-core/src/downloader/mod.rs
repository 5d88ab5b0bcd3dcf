//! Archive downloading and extraction.
//!
//! Archives are always fully downloaded to a local file before extraction
//! starts; extraction needs a complete, seekable stream.

mod archive;
mod file;

pub use archive::{ArchiveExtractor, ArchiveType};
pub use file::FileDownloader;
