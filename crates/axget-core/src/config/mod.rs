//! Installer configuration.
//!
//! # Configuration Sources (in priority order, highest to lowest)
//!
//! 1. Environment variables (`AXGET_*`)
//! 2. JSON configuration file given on the command line
//! 3. Built-in defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use axget_core::config::ConfigLoader;
//! use axget_core::Version;
//!
//! let config = ConfigLoader::new(true).build(None).unwrap();
//! let version = Version::new("7", "3", "1").unwrap();
//! println!("WAR mirror: {}", config.war_primary_url(&version).unwrap());
//! ```

mod config;
mod source;

pub use config::{Config, HttpSettings, DEFAULT_BRAND_FILE};
pub use source::{ConfigLoader, ConfigSource};
