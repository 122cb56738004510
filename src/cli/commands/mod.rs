//! CLI command implementations

pub mod download;
pub mod setup;
pub mod upload;

pub use download::execute as download;
pub use setup::execute as setup;
pub use upload::execute as upload;

use crate::cache::{platform_fingerprint, ArtifactCache, CacheKey};
use crate::config::Settings;
use crate::store::{ObjectStore, S3Client};
use crate::tools::ShellInstaller;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Open the artifact cache for the project in `root`
pub fn open_cache(settings: &Settings, root: &Path) -> ArtifactCache {
    let files: Vec<PathBuf> = settings.files.iter().map(|f| root.join(f)).collect();
    let key = CacheKey::compute(
        &platform_fingerprint(),
        &settings.environment_variables,
        &files,
    );
    debug!(
        "Cache key {} (env: {:?}, files: {:?})",
        key, settings.environment_variables, settings.files
    );

    let store = settings.store_config().map(|config| {
        debug!("Using bucket {} in {}", config.bucket_name, config.region);
        Box::new(S3Client::new(config)) as Box<dyn ObjectStore>
    });

    ArtifactCache::new(root, key, settings.cache_paths.clone())
        .with_store(store)
        .with_installer(Box::new(ShellInstaller::new(
            settings.install_command.clone(),
            root,
        )))
}
