//! Packing and unpacking artifacts with `tar`

use crate::error::WadResult;
use crate::tools::command::{run_captured, ProcessOutcome};
use std::path::{Path, PathBuf};
use tracing::info;

/// Produces and restores artifact archives
pub trait Archiver {
    /// Archive `sources` (relative to the project root) into `archive`
    fn pack(&self, archive: &Path, sources: &[PathBuf]) -> WadResult<ProcessOutcome>;

    /// Restore `archive` into the project root
    fn unpack(&self, archive: &Path) -> WadResult<ProcessOutcome>;
}

/// bzip2-compressed tarballs via the system `tar`
#[derive(Debug, Clone)]
pub struct TarArchiver {
    root: PathBuf,
}

impl TarArchiver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn pack_args(archive: &Path, sources: &[PathBuf]) -> Vec<String> {
        let mut args = vec!["-cjf".to_string(), archive.display().to_string()];
        args.extend(sources.iter().map(|p| p.display().to_string()));
        args
    }

    pub fn unpack_args(archive: &Path) -> Vec<String> {
        vec!["-xjf".to_string(), archive.display().to_string()]
    }
}

impl Archiver for TarArchiver {
    fn pack(&self, archive: &Path, sources: &[PathBuf]) -> WadResult<ProcessOutcome> {
        info!("Creating artifact with tar ({})", file_name(archive));
        run_captured("tar", &Self::pack_args(archive, sources), &self.root)
    }

    fn unpack(&self, archive: &Path) -> WadResult<ProcessOutcome> {
        info!("Unpacking artifact with tar ({})", file_name(archive));
        run_captured("tar", &Self::unpack_args(archive), &self.root)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}
