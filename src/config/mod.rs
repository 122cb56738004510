//! Configuration management for wad
//!
//! Settings are layered: flags and `WAD_*` environment variables win over
//! the project's `.wad.toml`, which wins over built-in defaults.

pub mod schema;

pub use schema::FileConfig;

use crate::error::{WadError, WadResult};
use crate::store::{Credentials, StoreConfig, DEFAULT_REGION};
use crate::tools::{default_install_command, DEFAULT_BUNDLE_WITHOUT};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the project configuration file
pub const LOCAL_CONFIG_FILE: &str = ".wad.toml";

/// Directory packed when nothing else is configured
pub const DEFAULT_CACHE_PATH: &str = ".bundle";

/// Configuration file loader
pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Manager that loads nothing
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Manager for an explicit config file
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: Some(path),
        }
    }

    /// Walk up from `start` looking for `.wad.toml`
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, falling back to defaults when no file is set
    pub fn load(&self) -> WadResult<FileConfig> {
        match &self.config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                debug!("No config file, using defaults");
                Ok(FileConfig::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> WadResult<FileConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| WadError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| WadError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path, if any
    pub fn path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Values given on the command line or through `WAD_*` variables
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bucket_name: Option<String>,
    pub credentials: Option<String>,
    pub region: Option<String>,
    pub bucket_in_hostname: bool,
    pub endpoint: Option<String>,
    pub environment_variables: Vec<String>,
    pub files: Vec<PathBuf>,
    pub cache_paths: Vec<PathBuf>,
    pub install_command: Option<String>,
    pub bundle_without: Option<String>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub bucket_name: Option<String>,
    pub credentials: Option<Credentials>,
    pub region: String,
    pub bucket_in_hostname: bool,
    pub endpoint: Option<String>,
    /// Environment variables mixed into the cache key
    pub environment_variables: Vec<String>,
    /// Files mixed into the cache key, relative to the project root
    pub files: Vec<PathBuf>,
    /// Directories packed into the artifact
    pub cache_paths: Vec<PathBuf>,
    pub install_command: String,
}

impl Settings {
    /// Merge overrides, the config file and defaults.
    ///
    /// `env` looks up the unprefixed fallbacks (`S3_BUCKET_NAME`,
    /// `S3_CREDENTIALS`) and `BUNDLE_GEMFILE`. Empty values count as unset.
    pub fn resolve<F>(overrides: Overrides, file: FileConfig, env: F) -> WadResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        let FileConfig { s3, cache } = file;

        let bucket_name = non_empty(overrides.bucket_name)
            .or_else(|| lookup("S3_BUCKET_NAME"))
            .or_else(|| non_empty(s3.bucket_name));

        let credentials = non_empty(overrides.credentials)
            .or_else(|| lookup("S3_CREDENTIALS"))
            .map(|value| Credentials::parse(&value))
            .transpose()?;

        let region = non_empty(overrides.region)
            .or_else(|| non_empty(s3.region))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let bucket_in_hostname =
            overrides.bucket_in_hostname || s3.bucket_in_hostname.unwrap_or(false);

        let endpoint = non_empty(overrides.endpoint).or_else(|| non_empty(s3.endpoint));

        let environment_variables = first_non_empty(
            clean_names(overrides.environment_variables),
            cache.environment_variables.map(clean_names),
        )
        .unwrap_or_default();

        let files = first_non_empty(
            clean_paths(overrides.files),
            cache.files.map(clean_paths),
        )
        .unwrap_or_else(|| {
            let gemfile = lookup("BUNDLE_GEMFILE").unwrap_or_else(|| "Gemfile".to_string());
            vec![PathBuf::from(format!("{}.lock", gemfile))]
        });

        let cache_paths = first_non_empty(
            clean_paths(overrides.cache_paths),
            cache.paths.map(clean_paths),
        )
        .unwrap_or_else(|| vec![PathBuf::from(DEFAULT_CACHE_PATH)]);

        let install_command = non_empty(overrides.install_command)
            .or_else(|| non_empty(cache.install_command))
            .unwrap_or_else(|| {
                let without = non_empty(overrides.bundle_without)
                    .or_else(|| non_empty(cache.bundle_without))
                    .unwrap_or_else(|| DEFAULT_BUNDLE_WITHOUT.to_string());
                default_install_command(&without)
            });

        Ok(Self {
            bucket_name,
            credentials,
            region,
            bucket_in_hostname,
            endpoint,
            environment_variables,
            files,
            cache_paths,
            install_command,
        })
    }

    /// Store settings, or `None` when caching is disabled
    pub fn store_config(&self) -> Option<StoreConfig> {
        let bucket = self.bucket_name.as_ref()?;
        let credentials = self.credentials.clone()?;

        let mut config = StoreConfig::new(bucket.clone(), credentials)
            .with_region(self.region.clone())
            .with_bucket_in_hostname(self.bucket_in_hostname);
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        Some(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_names(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| non_empty(Some(v)))
        .collect()
}

fn clean_paths(values: Vec<PathBuf>) -> Vec<PathBuf> {
    values
        .into_iter()
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

fn first_non_empty<T>(preferred: Vec<T>, fallback: Option<Vec<T>>) -> Option<Vec<T>> {
    if !preferred.is_empty() {
        return Some(preferred);
    }
    fallback.filter(|v| !v.is_empty())
}
