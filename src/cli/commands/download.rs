//! Download command - fetch and unpack the cached artifact

use crate::cli::commands::open_cache;
use crate::config::Settings;
use crate::error::WadResult;
use console::style;
use std::path::Path;

/// Execute the download command
pub fn execute(settings: &Settings, root: &Path) -> WadResult<()> {
    let mut cache = open_cache(settings, root);
    cache.download()?;

    println!(
        "{} {}",
        style("Restored dependencies from").green(),
        cache.key().object_key()
    );
    Ok(())
}
