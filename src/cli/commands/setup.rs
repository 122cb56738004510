//! Default command - restore dependencies or build and store them

use crate::cache::{SetupOutcome, UploadOutcome};
use crate::cli::commands::open_cache;
use crate::config::Settings;
use crate::error::WadResult;
use console::style;
use std::path::Path;

/// Execute the full cycle
pub fn execute(settings: &Settings, root: &Path) -> WadResult<()> {
    let mut cache = open_cache(settings, root);
    let outcome = cache.setup()?;

    match outcome {
        SetupOutcome::Uncached => {
            println!("{}", style("Dependencies installed (caching disabled)").yellow());
        }
        SetupOutcome::Restored => {
            println!(
                "{} {}",
                style("Restored dependencies from").green(),
                cache.key().object_key()
            );
        }
        SetupOutcome::Stored(UploadOutcome::Uploaded) => {
            println!(
                "{} {}",
                style("Dependencies installed and stored as").green(),
                cache.key().object_key()
            );
        }
        SetupOutcome::Stored(upload) => {
            println!(
                "{} (upload {})",
                style("Dependencies installed").green(),
                upload
            );
        }
    }

    Ok(())
}
