//! The acquisition and assembly pipeline.
//!
//! One [`Pipeline`] value performs exactly one install. The run is linear:
//!
//! ```text
//! Validating -> Downloading -> Extracting -> Assembling
//!            -> Branding? -> OwnershipRepair? -> Reporting -> Done
//! ```
//!
//! Validation performs no network access and no filesystem changes. Any
//! later failure aborts the run and leaves already written files in place.

mod assemble;
mod report;
mod validate;

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::downloader::{ArchiveExtractor, FileDownloader};
use crate::http::Fetcher;
use crate::naming::NameAllocator;
use crate::privilege::PrivilegeGate;
use crate::version::Version;
use crate::Result;

pub use assemble::AssembledRoot;
pub use report::{Advisory, InstallReport};
use validate::RunContext;

/// Which distribution to install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallKind {
    /// Web application sources with the business modules nested inside
    Source,
    /// Prebuilt WAR, unpacked for deployment
    Binary,
}

impl InstallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallKind::Source => "source",
            InstallKind::Binary => "binary",
        }
    }

    pub fn folder_name(&self, config: &Config, version: &Version) -> String {
        match self {
            InstallKind::Source => config.source_folder_name(version),
            InstallKind::Binary => config.binary_folder_name(version),
        }
    }

    /// Location of `application.properties` inside the assembled tree
    pub fn config_file(&self, final_dir: &Path) -> PathBuf {
        match self {
            InstallKind::Source => final_dir
                .join("src")
                .join("main")
                .join("resources")
                .join("application.properties"),
            InstallKind::Binary => final_dir
                .join("WEB-INF")
                .join("classes")
                .join("application.properties"),
        }
    }

    /// Directory that receives the branding logo
    pub fn brand_dir(&self, final_dir: &Path) -> PathBuf {
        match self {
            InstallKind::Source => final_dir.join("src").join("main").join("webapp").join("img"),
            InstallKind::Binary => final_dir.join("img"),
        }
    }
}

/// Inputs of one install
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub version: Version,
    pub kind: InstallKind,
    /// Destination root; relative paths resolve against the working directory
    pub out_dir: PathBuf,
    /// Logo to copy into the tree. `None` means the conventional default
    /// file inside `out_dir`, which is skipped silently when absent.
    pub brand_file: Option<PathBuf>,
}

impl InstallRequest {
    pub fn new(version: Version, kind: InstallKind) -> Self {
        Self {
            version,
            kind,
            out_dir: PathBuf::from("."),
            brand_file: None,
        }
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    pub fn with_brand_file(mut self, brand_file: impl Into<PathBuf>) -> Self {
        self.brand_file = Some(brand_file.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Downloading,
    Extracting,
    Assembling,
    Branding,
    OwnershipRepair,
    Reporting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Downloading => "downloading",
            Stage::Extracting => "extracting",
            Stage::Assembling => "assembling",
            Stage::Branding => "branding",
            Stage::OwnershipRepair => "repairing ownership",
            Stage::Reporting => "reporting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Receives progress notifications from a running pipeline.
pub trait InstallObserver {
    fn stage(&self, _stage: Stage) {}

    fn download_started(&self, _label: &str, _url: &str) {}

    fn download_progress(&self, _downloaded: u64, _total: u64) {}

    fn download_finished(&self, _label: &str) {}

    fn warning(&self, _message: &str) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default)]
pub struct NoopObserver;

impl InstallObserver for NoopObserver {}

/// A downloaded archive waiting for extraction
struct FetchedArchive {
    path: PathBuf,
    url: String,
}

pub struct Pipeline<'a> {
    config: &'a Config,
    request: InstallRequest,
    fetcher: &'a dyn Fetcher,
    gate: &'a dyn PrivilegeGate,
    observer: &'a dyn InstallObserver,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        request: InstallRequest,
        fetcher: &'a dyn Fetcher,
        gate: &'a dyn PrivilegeGate,
    ) -> Self {
        Self {
            config,
            request,
            fetcher,
            gate,
            observer: &NoopObserver,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn InstallObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Run the install to completion.
    pub fn run(&self) -> Result<InstallReport> {
        self.enter(Stage::Validating);
        let mut ctx = RunContext::validate(self.config, &self.request, self.gate, self.observer)?;
        let mut names = NameAllocator::initialize(&ctx.dest_root)?;

        let (root, sources) = match self.request.kind {
            InstallKind::Source => self.install_source(&ctx, &mut names)?,
            InstallKind::Binary => self.install_binary(&ctx, &mut names)?,
        };

        let brand_dest = match &ctx.brand_file {
            Some(brand_file) => {
                self.enter(Stage::Branding);
                Some(self.copy_branding(root.path(), brand_file)?)
            }
            None => None,
        };

        let mut ownership_repaired = false;
        if let Some(owner) = ctx.owner.clone() {
            self.enter(Stage::OwnershipRepair);
            match self.gate.chown_recursive(root.path(), owner.uid, owner.gid) {
                Ok(()) => {
                    log::info!("Ownership of {} set to {}", root.path().display(), owner.name);
                    ownership_repaired = true;
                }
                Err(e) => ctx.warn(
                    self.observer,
                    format!(
                        "Could not change ownership of {} to {}: {}. Ownership repair skipped.",
                        root.path().display(),
                        owner.name,
                        e
                    ),
                ),
            }
        }

        self.enter(Stage::Reporting);
        let final_dir = root.into_path();
        let report = InstallReport {
            kind: self.request.kind,
            version: self.request.version.clone(),
            product_name: self.config.product_name.clone(),
            config_file: self.request.kind.config_file(&final_dir),
            final_dir,
            brand_dest,
            ownership_repaired,
            sources,
            warnings: ctx.warnings,
        };

        self.enter(Stage::Done);
        Ok(report)
    }

    fn enter(&self, stage: Stage) {
        log::debug!("Pipeline stage: {}", stage);
        self.observer.stage(stage);
    }

    /// Download both source archives, extract each into its own temporary
    /// directory, then nest the modules inside the renamed web application.
    fn install_source(
        &self,
        ctx: &RunContext,
        names: &mut NameAllocator,
    ) -> Result<(AssembledRoot, Vec<String>)> {
        let version = &self.request.version;
        let webapp_url = self.config.webapp_source_url(version)?;
        let module_url = self.config.module_source_url(version)?;

        let module_dir = ctx.dest_root.join(names.allocate()?);
        let webapp_dir = ctx.dest_root.join(names.allocate()?);

        self.enter(Stage::Downloading);
        let webapp = self.fetch(ctx, names, "web application sources", &webapp_url)?;
        let module = self.fetch(ctx, names, "business module sources", &module_url)?;

        self.enter(Stage::Extracting);
        self.extract(&webapp, &webapp_dir)?;
        self.extract(&module, &module_dir)?;

        self.enter(Stage::Assembling);
        let root = AssembledRoot::claim(&webapp_dir, &ctx.final_dir)?;
        let nested = root.nest(
            &module_dir,
            &Path::new(&self.config.modules_dir).join(&self.config.module_name),
        )?;
        log::info!("Business modules placed in {}", nested.display());

        Ok((root, vec![webapp.url, module.url]))
    }

    /// Download the WAR from the primary or fallback mirror and unpack it
    /// into a freshly created final directory.
    fn install_binary(
        &self,
        ctx: &RunContext,
        names: &mut NameAllocator,
    ) -> Result<(AssembledRoot, Vec<String>)> {
        let version = &self.request.version;
        let primary = self.config.war_primary_url(version)?;
        let fallback = self.config.war_fallback_url(version)?;

        self.enter(Stage::Downloading);
        let war_path = ctx.dest_root.join(names.allocate()?);
        let label = self.config.war_artifact(version);
        self.observer.download_started(&label, &primary);
        let progress: &dyn Fn(u64, u64) = &|done, total| self.observer.download_progress(done, total);
        let used = FileDownloader::new(self.fetcher).download_with_fallback(
            &primary,
            &fallback,
            &war_path,
            Some(progress),
        )?;
        self.observer.download_finished(&label);
        let war = FetchedArchive {
            path: war_path,
            url: used.to_string(),
        };

        self.enter(Stage::Extracting);
        let root = AssembledRoot::create(&ctx.final_dir)?;
        self.extract(&war, root.path())?;

        self.enter(Stage::Assembling);
        log::info!("Deployment unpacked into {}", root.path().display());

        Ok((root, vec![war.url]))
    }

    fn fetch(
        &self,
        ctx: &RunContext,
        names: &mut NameAllocator,
        label: &str,
        url: &str,
    ) -> Result<FetchedArchive> {
        let path = ctx.dest_root.join(names.allocate()?);
        self.observer.download_started(label, url);
        let progress: &dyn Fn(u64, u64) = &|done, total| self.observer.download_progress(done, total);
        FileDownloader::new(self.fetcher).download(url, &path, Some(progress))?;
        self.observer.download_finished(label);

        Ok(FetchedArchive {
            path,
            url: url.to_string(),
        })
    }

    /// Extract with root stripping, then discard the archive file.
    fn extract(&self, archive: &FetchedArchive, dest: &Path) -> Result<()> {
        log::debug!("Extracting {} into {}", archive.path.display(), dest.display());
        ArchiveExtractor::extract(&archive.path, dest, true)?;
        fs::remove_file(&archive.path)?;
        Ok(())
    }

    fn copy_branding(&self, final_dir: &Path, brand_file: &Path) -> Result<PathBuf> {
        let brand_dir = self.request.kind.brand_dir(final_dir);
        fs::create_dir_all(&brand_dir)?;

        let file_name: OsString = brand_file
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(&self.config.default_brand_file));
        let dest = brand_dir.join(file_name);
        fs::copy(brand_file, &dest)?;

        log::info!("Branding logo copied to {}", dest.display());
        Ok(dest)
    }
}
