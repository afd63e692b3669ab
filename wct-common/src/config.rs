//! Configuration loading and resolution
//!
//! Each field resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the database location
pub const ENV_DATABASE: &str = "WCT_DATABASE";
/// Environment variable overriding the listen address
pub const ENV_BIND: &str = "WCT_BIND";

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:5730";
/// Role holding talk submitters
pub const DEFAULT_APPLICANT_ROLE: &str = "subscriber";
/// Highest rating value a rater can give
pub const DEFAULT_RATING_SCALE: i64 = 5;
/// Applicants shown per admin page
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct WctConfig {
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub applicant_role: String,
    pub rating_scale: i64,
    pub page_size: i64,
    /// Public site root used in profile links; empty yields root-relative links
    pub site_url: String,
}

impl Default for WctConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_addr: DEFAULT_BIND.to_string(),
            applicant_role: DEFAULT_APPLICANT_ROLE.to_string(),
            rating_scale: DEFAULT_RATING_SCALE,
            page_size: DEFAULT_PAGE_SIZE,
            site_url: String::new(),
        }
    }
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub applicant_role: Option<String>,
    pub rating_scale: Option<i64>,
    pub page_size: Option<i64>,
    pub site_url: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Values supplied on the command line
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub config_file: Option<PathBuf>,
}

impl WctConfig {
    /// Resolve configuration from CLI, environment, TOML file and defaults
    ///
    /// A missing or unparsable TOML file is not fatal: a warning is logged
    /// and resolution continues with defaults.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let file_path = overrides.config_file.clone().or_else(find_config_file);

        let file = match file_path {
            Some(path) => match TomlConfig::load(&path) {
                Ok(cfg) => {
                    debug!(path = %path.display(), "Loaded config file");
                    cfg
                }
                Err(e) => {
                    warn!("Ignoring config file: {}", e);
                    TomlConfig::default()
                }
            },
            None => TomlConfig::default(),
        };

        Self::merge(overrides, &file, |key| std::env::var(key).ok())
    }

    /// Merge the four tiers; `env` is injected so tests need not touch the process env
    pub fn merge(
        overrides: &ConfigOverrides,
        file: &TomlConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let defaults = Self::default();

        let database_path = overrides
            .database_path
            .clone()
            .or_else(|| env(ENV_DATABASE).map(PathBuf::from))
            .or_else(|| file.database_path.clone())
            .unwrap_or(defaults.database_path);

        let bind_addr = overrides
            .bind_addr
            .clone()
            .or_else(|| env(ENV_BIND))
            .or_else(|| file.bind_addr.clone())
            .unwrap_or(defaults.bind_addr);

        let config = Self {
            database_path,
            bind_addr,
            applicant_role: file
                .applicant_role
                .clone()
                .unwrap_or(defaults.applicant_role),
            rating_scale: file.rating_scale.unwrap_or(defaults.rating_scale),
            page_size: file.page_size.unwrap_or(defaults.page_size),
            site_url: file.site_url.clone().unwrap_or(defaults.site_url),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.rating_scale) {
            return Err(Error::Config(format!(
                "rating_scale must be between 1 and 10, got {}",
                self.rating_scale
            )));
        }
        if self.page_size < 1 {
            return Err(Error::Config(format!(
                "page_size must be positive, got {}",
                self.page_size
            )));
        }
        if self.applicant_role.trim().is_empty() {
            return Err(Error::Config("applicant_role must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Locate a config file: ~/.config/wct/config.toml, then /etc/wct/config.toml
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("wct").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/wct/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("wct").join("wct.db"))
        .unwrap_or_else(|| PathBuf::from("./wct_data/wct.db"))
}
