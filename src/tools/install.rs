//! Running the dependency install command

use crate::error::WadResult;
use crate::tools::command::{run_shell_inherited, ProcessOutcome};
use std::path::PathBuf;
use tracing::info;

/// Groups skipped by the default install command
pub const DEFAULT_BUNDLE_WITHOUT: &str = "development production";

/// Default install command for a given set of skipped groups
pub fn default_install_command(without: &str) -> String {
    format!("bundle install --path .bundle --without='{}'", without)
}

/// Resolves and builds dependencies from scratch
pub trait Installer {
    fn install(&self) -> WadResult<ProcessOutcome>;
}

/// Runs a shell command line in the project root
#[derive(Debug, Clone)]
pub struct ShellInstaller {
    command: String,
    root: PathBuf,
}

impl ShellInstaller {
    pub fn new(command: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            root: root.into(),
        }
    }
}

impl Installer for ShellInstaller {
    fn install(&self) -> WadResult<ProcessOutcome> {
        info!("Installing...");
        println!("{}", self.command);
        run_shell_inherited(&self.command, &self.root)
    }
}
