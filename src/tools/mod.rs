//! External collaborators: the archiver and the install command
//!
//! Both run as subprocesses in the project root and report back an explicit
//! [`ProcessOutcome`] instead of an exit-status side channel.

pub mod archive;
pub mod command;
pub mod install;

pub use archive::{Archiver, TarArchiver};
pub use command::ProcessOutcome;
pub use install::{default_install_command, Installer, ShellInstaller, DEFAULT_BUNDLE_WITHOUT};
