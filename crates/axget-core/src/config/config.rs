use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::http::{HttpClientConfig, DEFAULT_CHUNK_SIZE};
use crate::version::Version;
use crate::{AxGetError, Result};

pub const DEFAULT_BRAND_FILE: &str = "branding_logo.png";

const VERSION_PLACEHOLDER: &str = "{version}";
const ARTIFACT_PLACEHOLDER: &str = "{artifact}";

/// Installer configuration.
///
/// URL fields are templates: `{version}` is replaced by the dotted version
/// and `{artifact}` by `<war_basename><version>.war`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Prefix of the assembled folder name (`<product>-v<version>`)
    pub product_name: String,

    /// Source archive of the web application shell
    pub webapp_source_url: String,

    /// Source archive of the business modules, nested inside the shell
    pub module_source_url: String,

    /// Preferred mirror for the deployable WAR
    pub war_primary_url: String,

    /// Mirror tried when the preferred one fails
    pub war_fallback_url: String,

    pub war_basename: String,

    /// Directory under the source tree that receives the business modules
    pub modules_dir: String,

    /// Folder name of the business modules inside `modules_dir`
    pub module_name: String,

    /// Account that should own binary deployments
    pub service_account: String,

    pub default_brand_file: String,

    pub http: HttpSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            product_name: "axelor".to_string(),
            webapp_source_url:
                "https://github.com/axelor/open-suite-webapp/archive/refs/tags/v{version}.zip"
                    .to_string(),
            module_source_url:
                "https://github.com/axelor/axelor-open-suite/archive/refs/tags/v{version}.zip"
                    .to_string(),
            war_primary_url:
                "https://github.com/axelor/axelor-open-suite/releases/download/v{version}/{artifact}"
                    .to_string(),
            war_fallback_url:
                "https://github.com/axelor/open-suite-webapp/releases/download/v{version}/{artifact}"
                    .to_string(),
            war_basename: "axelor-erp-v".to_string(),
            modules_dir: "modules".to_string(),
            module_name: "axelor-open-suite".to_string(),
            service_account: "tomcat".to_string(),
            default_brand_file: DEFAULT_BRAND_FILE.to_string(),
            http: HttpSettings::default(),
        }
    }
}

/// Network tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HttpSettings {
    /// Whole-request timeout in seconds, unlimited when unset
    pub timeout: Option<u64>,
    pub connect_timeout: u64,
    pub max_retries: u32,
    pub proxy: Option<String>,
    pub chunk_size: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let defaults = HttpClientConfig::default();
        Self {
            timeout: defaults.timeout.map(|t| t.as_secs()),
            connect_timeout: defaults.connect_timeout.as_secs(),
            max_retries: defaults.max_retries,
            proxy: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// File name of the WAR for `version`
    pub fn war_artifact(&self, version: &Version) -> String {
        format!("{}{}.war", self.war_basename, version)
    }

    pub fn webapp_source_url(&self, version: &Version) -> Result<String> {
        self.render(&self.webapp_source_url, version)
    }

    pub fn module_source_url(&self, version: &Version) -> Result<String> {
        self.render(&self.module_source_url, version)
    }

    pub fn war_primary_url(&self, version: &Version) -> Result<String> {
        self.render(&self.war_primary_url, version)
    }

    pub fn war_fallback_url(&self, version: &Version) -> Result<String> {
        self.render(&self.war_fallback_url, version)
    }

    /// `<product>-v<version>-src`
    pub fn source_folder_name(&self, version: &Version) -> String {
        format!("{}-v{}-src", self.product_name, version)
    }

    /// `<product>-v<version>`
    pub fn binary_folder_name(&self, version: &Version) -> String {
        format!("{}-v{}", self.product_name, version)
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut config = HttpClientConfig::new()
            .with_connect_timeout(Duration::from_secs(self.http.connect_timeout))
            .with_max_retries(self.http.max_retries)
            .with_chunk_size(self.http.chunk_size);
        if let Some(timeout) = self.http.timeout {
            config = config.with_timeout(Duration::from_secs(timeout));
        }
        if let Some(proxy) = &self.http.proxy {
            config = config.with_proxy(proxy.clone());
        }
        config
    }

    /// Check that names are usable as path components and that every URL
    /// template renders to an absolute URL.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("product-name", &self.product_name),
            ("modules-dir", &self.modules_dir),
            ("module-name", &self.module_name),
        ] {
            if value.is_empty() || value.contains('/') || value.contains('\\') || value == ".." {
                return Err(AxGetError::Config(format!(
                    "{} must be a single path component, got {:?}",
                    key, value
                )));
            }
        }

        if self.http.chunk_size == 0 {
            return Err(AxGetError::Config("http.chunk-size must be positive".to_string()));
        }

        let sample = Version::new("0", "0", "0")?;
        for (key, template) in [
            ("webapp-source-url", &self.webapp_source_url),
            ("module-source-url", &self.module_source_url),
            ("war-primary-url", &self.war_primary_url),
            ("war-fallback-url", &self.war_fallback_url),
        ] {
            if !template.contains(VERSION_PLACEHOLDER) {
                return Err(AxGetError::Config(format!(
                    "{} must contain {}",
                    key, VERSION_PLACEHOLDER
                )));
            }
            self.render(template, &sample)
                .map_err(|e| AxGetError::Config(format!("{}: {}", key, e)))?;
        }

        Ok(())
    }

    fn render(&self, template: &str, version: &Version) -> Result<String> {
        let version = version.to_string();
        let rendered = template
            .replace(ARTIFACT_PLACEHOLDER, &format!("{}{}.war", self.war_basename, version))
            .replace(VERSION_PLACEHOLDER, &version);

        url::Url::parse(&rendered)
            .map_err(|e| AxGetError::Config(format!("invalid URL {}: {}", rendered, e)))?;

        Ok(rendered)
    }
}
