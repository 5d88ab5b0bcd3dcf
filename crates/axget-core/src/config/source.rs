use std::env;
use std::fs;
use std::path::Path;

use super::config::Config;
use crate::{AxGetError, Result};

/// Represents the source of a configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Default built-in value
    Default,
    /// From a JSON configuration file
    File,
    /// From environment variable
    Environment(String),
}

impl ConfigSource {
    pub fn as_str(&self) -> &str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment(var) => var,
        }
    }
}

/// Loads configuration from defaults, a JSON file and the environment,
/// later sources overriding earlier ones.
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Get an AXGET_* environment variable
    pub fn get_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Load configuration from a JSON file. Missing keys keep their defaults.
    pub fn load_config_file(&self, path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)
            .map_err(|e| AxGetError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| AxGetError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Override values of `config` from the environment.
    pub fn apply_env(&self, config: &mut Config) -> Result<Vec<ConfigSource>> {
        let mut applied = Vec::new();

        let strings: [(&str, &mut String); 6] = [
            ("AXGET_PRODUCT_NAME", &mut config.product_name),
            ("AXGET_WEBAPP_SRC_URL", &mut config.webapp_source_url),
            ("AXGET_MODULE_SRC_URL", &mut config.module_source_url),
            ("AXGET_WAR_PRIMARY_URL", &mut config.war_primary_url),
            ("AXGET_WAR_FALLBACK_URL", &mut config.war_fallback_url),
            ("AXGET_SERVICE_ACCOUNT", &mut config.service_account),
        ];
        for (var, slot) in strings {
            if let Some(value) = self.get_env(var) {
                *slot = value;
                applied.push(ConfigSource::Environment(var.to_string()));
            }
        }

        if let Some(value) = self.get_env("AXGET_TIMEOUT") {
            config.http.timeout = Some(parse_number("AXGET_TIMEOUT", &value)?);
            applied.push(ConfigSource::Environment("AXGET_TIMEOUT".to_string()));
        }

        if let Some(value) = self.get_env("AXGET_MAX_RETRIES") {
            config.http.max_retries = parse_number("AXGET_MAX_RETRIES", &value)?;
            applied.push(ConfigSource::Environment("AXGET_MAX_RETRIES".to_string()));
        }

        if let Some(value) = self.get_env("AXGET_PROXY") {
            config.http.proxy = Some(value);
            applied.push(ConfigSource::Environment("AXGET_PROXY".to_string()));
        }

        Ok(applied)
    }

    /// Build the effective configuration and validate it.
    pub fn build(&self, config_file: Option<&Path>) -> Result<Config> {
        self.build_with_sources(config_file).map(|(config, _)| config)
    }

    /// Like [`ConfigLoader::build`], also returning where the values came
    /// from, lowest priority first.
    pub fn build_with_sources(
        &self,
        config_file: Option<&Path>,
    ) -> Result<(Config, Vec<ConfigSource>)> {
        let (mut config, mut sources) = match config_file {
            Some(path) => {
                log::debug!("Loading configuration from {}", path.display());
                (self.load_config_file(path)?, vec![ConfigSource::File])
            }
            None => (Config::default(), vec![ConfigSource::Default]),
        };

        sources.extend(self.apply_env(&mut config)?);
        for source in &sources {
            log::debug!("Configuration source: {}", source.as_str());
        }

        config.validate()?;
        Ok((config, sources))
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AxGetError::Config(format!("{} must be a number, got {:?}", var, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_disabled_returns_none() {
        let loader = ConfigLoader::new(false);
        assert_eq!(loader.get_env("PATH"), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number::<u64>("AXGET_TIMEOUT", " 30 ").unwrap(), 30);
        assert!(parse_number::<u32>("AXGET_MAX_RETRIES", "many").is_err());
    }

    #[test]
    fn test_file_source_is_recorded() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("axget.json");
        std::fs::write(&path, r#"{"product-name": "acme", "http": {"max-retries": 2}}"#).unwrap();

        let (config, sources) = ConfigLoader::new(false)
            .build_with_sources(Some(&path))
            .unwrap();

        assert_eq!(config.product_name, "acme");
        assert_eq!(config.http.max_retries, 2);
        assert_eq!(config.service_account, "tomcat");
        assert_eq!(sources, vec![ConfigSource::File]);
    }

    #[test]
    fn test_defaults_source_without_file() {
        let (config, sources) = ConfigLoader::new(false).build_with_sources(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(sources, vec![ConfigSource::Default]);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("axget.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = ConfigLoader::new(false).build(Some(&path)).unwrap_err();
        assert!(matches!(err, AxGetError::Config(_)));
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_config_source_names() {
        assert_eq!(ConfigSource::Default.as_str(), "default");
        assert_eq!(
            ConfigSource::Environment("AXGET_PROXY".to_string()).as_str(),
            "AXGET_PROXY"
        );
    }
}
