//! Subprocess execution with explicit outcomes

use crate::error::{WadError, WadResult};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// How an external command finished
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Command line as run
    pub command: String,
    pub exited_zero: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn success(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            exited_zero: true,
            ..Default::default()
        }
    }

    pub fn failure(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            exited_zero: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Turn a non-zero exit into [`WadError::ExternalProcess`]
    pub fn into_result(self, step: &str) -> WadResult<Self> {
        if self.exited_zero {
            return Ok(self);
        }
        Err(WadError::ExternalProcess {
            step: step.to_string(),
            command: self.command,
            stderr: self.stderr,
        })
    }
}

/// Render a program and its arguments for logs and errors
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a program in `cwd`, capturing its output
pub fn run_captured(program: &str, args: &[String], cwd: &Path) -> WadResult<ProcessOutcome> {
    let rendered = display_command(program, args);
    debug!("Executing: {} (in {})", rendered, cwd.display());

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| WadError::command_failed(rendered.clone(), e))?;

    Ok(ProcessOutcome {
        command: rendered,
        exited_zero: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a shell command line in `cwd` with the terminal attached
pub fn run_shell_inherited(command: &str, cwd: &Path) -> WadResult<ProcessOutcome> {
    debug!("Executing interactively: sh -c {:?} (in {})", command, cwd.display());

    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| WadError::command_failed(command, e))?;

    Ok(ProcessOutcome {
        command: command.to_string(),
        exited_zero: status.success(),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn display_joins_arguments() {
        let args = vec!["-cjf".to_string(), "a.tar.bz2".to_string()];
        assert_eq!(display_command("tar", &args), "tar -cjf a.tar.bz2");
    }

    #[test]
    fn captured_success() {
        let dir = TempDir::new().unwrap();
        let outcome = run_captured("sh", &["-c".into(), "echo hi".into()], dir.path()).unwrap();
        assert!(outcome.exited_zero);
        assert_eq!(outcome.command, "sh -c echo hi");
        assert_eq!(outcome.stdout.trim(), "hi");
    }

    #[test]
    fn captured_failure_keeps_stderr() {
        let dir = TempDir::new().unwrap();
        let outcome =
            run_captured("sh", &["-c".into(), "echo broken >&2; exit 3".into()], dir.path())
                .unwrap();
        assert!(!outcome.exited_zero);
        assert_eq!(outcome.stderr.trim(), "broken");
    }

    #[test]
    fn missing_program_is_command_failed() {
        let dir = TempDir::new().unwrap();
        let result = run_captured("wad-definitely-not-a-program", &[], dir.path());
        assert!(matches!(result, Err(WadError::CommandFailed { .. })));
    }

    #[test]
    fn shell_runs_in_cwd() {
        let dir = TempDir::new().unwrap();
        let outcome = run_shell_inherited("touch marker", dir.path()).unwrap();
        assert!(outcome.exited_zero);
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn into_result_maps_failure() {
        let err = ProcessOutcome::failure("bundle install", "nope")
            .into_result("Installing dependencies")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Installing dependencies failed: `bundle install`: nope"
        );
        assert!(ProcessOutcome::success("true").into_result("x").is_ok());
    }
}
