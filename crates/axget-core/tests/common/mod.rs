//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use axget_core::http::HttpError;
use axget_core::{AccessMode, Config, Fetcher, PrivilegeGate, ServiceIdentity};
use zip::write::SimpleFileOptions;

pub const WEBAPP_URL: &str = "https://mirror.test/webapp/v7.3.1.zip";
pub const MODULE_URL: &str = "https://mirror.test/suite/v7.3.1.zip";
pub const WAR_PRIMARY_URL: &str = "https://primary.test/v7.3.1/axelor-erp-v7.3.1.war";
pub const WAR_FALLBACK_URL: &str = "https://fallback.test/v7.3.1/axelor-erp-v7.3.1.war";

/// Configuration pointing at the `.test` mirrors served by [`ScriptedFetcher`].
pub fn test_config() -> Config {
    Config {
        webapp_source_url: "https://mirror.test/webapp/v{version}.zip".to_string(),
        module_source_url: "https://mirror.test/suite/v{version}.zip".to_string(),
        war_primary_url: "https://primary.test/v{version}/{artifact}".to_string(),
        war_fallback_url: "https://fallback.test/v{version}/{artifact}".to_string(),
        ..Config::default()
    }
}

/// Build a zip in memory. Names ending in `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
    }

    writer.finish().unwrap().into_inner()
}

/// Web application sources wrapped in a single top-level directory, with an
/// empty placeholder where the business modules go.
pub fn webapp_archive() -> Vec<u8> {
    zip_bytes(&[
        ("open-suite-webapp-7.3.1/", ""),
        ("open-suite-webapp-7.3.1/pom.xml", "<project/>"),
        ("open-suite-webapp-7.3.1/modules/", ""),
        ("open-suite-webapp-7.3.1/modules/axelor-open-suite/", ""),
        ("open-suite-webapp-7.3.1/src/", ""),
        (
            "open-suite-webapp-7.3.1/src/main/resources/application.properties",
            "application.logo = img/axelor.png\n",
        ),
    ])
}

pub fn module_archive() -> Vec<u8> {
    zip_bytes(&[
        ("axelor-open-suite-7.3.1/", ""),
        ("axelor-open-suite-7.3.1/build.gradle", "// suite"),
        ("axelor-open-suite-7.3.1/axelor-base/", ""),
        ("axelor-open-suite-7.3.1/axelor-base/build.gradle", "// base"),
    ])
}

/// A WAR has several top-level directories, so nothing is stripped.
pub fn war_archive() -> Vec<u8> {
    zip_bytes(&[
        ("META-INF/", ""),
        ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n"),
        ("WEB-INF/", ""),
        (
            "WEB-INF/classes/application.properties",
            "application.logo = img/axelor.png\n",
        ),
        ("img/", ""),
        ("img/axelor.png", "png"),
        ("index.jsp", "<html/>"),
    ])
}

/// Serves fixed bodies per URL, fails everything else with a 404 and
/// records every request in order.
#[derive(Default)]
pub struct ScriptedFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requested: RefCell<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64, HttpError> {
        self.requested.borrow_mut().push(url.to_string());

        let body = self.bodies.get(url).ok_or_else(|| HttpError::HttpStatus {
            status: 404,
            url: url.to_string(),
        })?;

        fs::write(dest, body)?;
        if let Some(callback) = progress {
            callback(body.len() as u64, body.len() as u64);
        }
        Ok(body.len() as u64)
    }
}

/// Privilege gate with scripted answers.
///
/// Paths ending with a `with_denied` suffix are inaccessible until a
/// successful escalation; paths ending with a `with_blocked` suffix stay
/// inaccessible regardless.
#[derive(Default)]
pub struct ScriptedGate {
    identity: Option<ServiceIdentity>,
    can_escalate: bool,
    chown_fails: bool,
    denied: Vec<PathBuf>,
    blocked: Vec<PathBuf>,
    escalated: Cell<bool>,
    escalations: Cell<usize>,
    chowned: RefCell<Vec<(PathBuf, u32, u32)>>,
}

impl ScriptedGate {
    /// An unprivileged process on a system without the service account.
    pub fn plain() -> Self {
        Self::default()
    }

    /// A process that may become root, with a `tomcat` account present.
    pub fn privileged() -> Self {
        Self {
            identity: Some(tomcat()),
            can_escalate: true,
            ..Self::default()
        }
    }

    pub fn with_identity(mut self, identity: ServiceIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_denied(mut self, suffix: impl Into<PathBuf>) -> Self {
        self.denied.push(suffix.into());
        self
    }

    pub fn with_blocked(mut self, suffix: impl Into<PathBuf>) -> Self {
        self.blocked.push(suffix.into());
        self
    }

    pub fn failing_chown(mut self) -> Self {
        self.chown_fails = true;
        self
    }

    pub fn escalations(&self) -> usize {
        self.escalations.get()
    }

    pub fn chowned(&self) -> Vec<(PathBuf, u32, u32)> {
        self.chowned.borrow().clone()
    }
}

pub fn tomcat() -> ServiceIdentity {
    ServiceIdentity {
        name: "tomcat".to_string(),
        uid: 91,
        gid: 91,
    }
}

impl PrivilegeGate for ScriptedGate {
    fn lookup_service_identity(&self) -> Option<ServiceIdentity> {
        self.identity.clone()
    }

    fn escalate(&self) -> bool {
        self.escalations.set(self.escalations.get() + 1);
        if self.can_escalate {
            self.escalated.set(true);
        }
        self.can_escalate
    }

    fn has_access(&self, path: &Path, _mode: AccessMode) -> bool {
        if self.blocked.iter().any(|p| path.ends_with(p)) {
            return false;
        }
        if self.denied.iter().any(|p| path.ends_with(p)) {
            return self.escalated.get();
        }
        true
    }

    fn chown_recursive(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        if self.chown_fails {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "operation not permitted"));
        }
        self.chowned.borrow_mut().push((path.to_path_buf(), uid, gid));
        Ok(())
    }
}

/// Sorted entry names of `dir`
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
