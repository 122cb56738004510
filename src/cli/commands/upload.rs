//! Upload command - pack and store directories

use crate::cache::UploadOutcome;
use crate::cli::args::UploadArgs;
use crate::cli::commands::open_cache;
use crate::config::Settings;
use crate::error::WadResult;
use console::style;
use std::path::Path;

/// Execute the upload command.
///
/// Store failures are reported but never fail the command.
pub fn execute(args: UploadArgs, settings: &Settings, root: &Path) -> WadResult<()> {
    let mut cache = open_cache(settings, root);

    match cache.upload(&args.dirs)? {
        UploadOutcome::Uploaded => println!(
            "{} {}",
            style("Uploaded").green(),
            cache.key().object_key()
        ),
        UploadOutcome::Failed(reason) => {
            println!("{} {}", style("Upload failed:").yellow(), reason)
        }
        other => println!("Upload skipped: {}", other),
    }

    Ok(())
}
