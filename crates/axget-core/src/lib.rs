pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod naming;
pub mod pipeline;
pub mod privilege;
pub mod version;

pub use error::{AxGetError, Result};
pub use version::Version;
pub use config::{Config, ConfigLoader};
pub use naming::NameAllocator;
pub use downloader::{ArchiveExtractor, ArchiveType, FileDownloader};
pub use http::{Fetcher, HttpClient, HttpClientConfig};
pub use privilege::{AccessMode, PrivilegeGate, ServiceIdentity, SystemPrivilegeGate};
pub use pipeline::{
    Advisory, InstallKind, InstallObserver, InstallReport, InstallRequest,
    NoopObserver, Pipeline, Stage,
};
