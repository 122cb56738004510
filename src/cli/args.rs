//! CLI argument definitions using clap derive

use crate::config::Overrides;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;

/// Wad - dependency artifact cache for CI
///
/// Restores installed dependencies from S3 keyed on the lockfile, or runs
/// the install command and uploads the result for the next build.
#[derive(Parser, Debug)]
#[command(name = "wad")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute (default: full restore-or-build cycle)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "WAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .wad.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub cache: CacheArgs,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Fetch and unpack the cached artifact only
    Download,

    /// Pack and upload directories only
    Upload(UploadArgs),
}

/// Arguments for the upload command
#[derive(Args, Debug, PartialEq)]
pub struct UploadArgs {
    /// Directories to pack (default: the configured cache paths)
    pub dirs: Vec<PathBuf>,
}

/// Object store options
#[derive(Args, Debug, Default)]
pub struct StoreArgs {
    /// Bucket holding artifacts
    #[arg(long = "bucket", global = true, env = "WAD_S3_BUCKET_NAME")]
    pub bucket_name: Option<String>,

    /// Credentials as ACCESS_KEY_ID:SECRET_ACCESS_KEY
    #[arg(long, global = true, env = "WAD_S3_CREDENTIALS", hide_env_values = true)]
    pub credentials: Option<String>,

    /// AWS region of the bucket
    #[arg(long, global = true, env = "WAD_AWS_REGION")]
    pub region: Option<String>,

    /// Address the bucket as {bucket}.s3.amazonaws.com
    #[arg(long, global = true, env = "WAD_BUCKET_IN_HOSTNAME")]
    pub bucket_in_hostname: bool,

    /// URL base for S3-compatible stores
    #[arg(long, global = true, env = "WAD_S3_ENDPOINT")]
    pub endpoint: Option<String>,
}

/// Cache key and artifact options
#[derive(Args, Debug, Default)]
pub struct CacheArgs {
    /// Environment variables mixed into the cache key
    #[arg(
        long = "env-var",
        global = true,
        env = "WAD_ENVIRONMENT_VARIABLES",
        value_delimiter = ','
    )]
    pub environment_variables: Vec<String>,

    /// Files whose contents are mixed into the cache key
    #[arg(long = "file", global = true, env = "WAD_FILES", value_delimiter = ',')]
    pub files: Vec<PathBuf>,

    /// Directories packed into the artifact
    #[arg(
        long = "cache-path",
        global = true,
        env = "WAD_CACHE_PATH",
        value_delimiter = ','
    )]
    pub cache_paths: Vec<PathBuf>,

    /// Command run when no artifact is cached
    #[arg(long, global = true, env = "WAD_INSTALL_COMMAND")]
    pub install_command: Option<String>,

    /// Bundler groups skipped by the default install command
    #[arg(long, global = true, env = "WAD_BUNDLE_WITHOUT")]
    pub bundle_without: Option<String>,
}

impl Cli {
    /// Verbosity from `-v` flags, raised to 1 by a truthy `WAD_VERBOSE`
    pub fn verbosity(&self) -> u8 {
        let from_env = env::var("WAD_VERBOSE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        self.verbose.max(u8::from(from_env))
    }

    /// Values to layer over the config file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            bucket_name: self.store.bucket_name.clone(),
            credentials: self.store.credentials.clone(),
            region: self.store.region.clone(),
            bucket_in_hostname: self.store.bucket_in_hostname,
            endpoint: self.store.endpoint.clone(),
            environment_variables: self.cache.environment_variables.clone(),
            files: self.cache.files.clone(),
            cache_paths: self.cache.cache_paths.clone(),
            install_command: self.cache.install_command.clone(),
            bundle_without: self.cache.bundle_without.clone(),
        }
    }
}
