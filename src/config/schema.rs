//! Project configuration file schema
//!
//! Stored at `.wad.toml` in the project (or any parent directory). Every
//! field is optional; environment variables and flags take precedence.
//! Credentials are never read from this file.

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Object store settings
    pub s3: S3Config,

    /// Cache key and artifact settings
    pub cache: CacheConfig,
}

/// Object store settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Bucket holding artifacts
    pub bucket_name: Option<String>,

    /// AWS region of the bucket
    pub region: Option<String>,

    /// Use `{bucket}.s3.amazonaws.com` addressing
    pub bucket_in_hostname: Option<bool>,

    /// URL base for S3-compatible stores
    pub endpoint: Option<String>,
}

/// Cache key and artifact settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Environment variables mixed into the cache key
    pub environment_variables: Option<Vec<String>>,

    /// Files whose contents are mixed into the cache key
    pub files: Option<Vec<PathBuf>>,

    /// Directories packed into the artifact
    pub paths: Option<Vec<PathBuf>>,

    /// Command run on a cache miss
    pub install_command: Option<String>,

    /// Bundler groups skipped by the default install command
    pub bundle_without: Option<String>,
}
