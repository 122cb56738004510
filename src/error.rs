//! Error types for wad
//!
//! All modules use `WadResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for wad operations
pub type WadResult<T> = Result<T, WadError>;

/// All errors that can occur in wad
#[derive(Error, Debug)]
pub enum WadError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid S3 credentials: expected ACCESS_KEY_ID:SECRET_ACCESS_KEY")]
    InvalidCredentials,

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Object store errors
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Object store responded with HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // Cache errors
    #[error("Caching is disabled: no S3 bucket or credentials configured")]
    CacheDisabled,

    #[error("No cached artifact available for {key}")]
    ArtifactUnavailable { key: String },

    // Process errors
    #[error("{step} failed: `{command}`{}", stderr_suffix(.stderr))]
    ExternalProcess {
        step: String,
        command: String,
        stderr: String,
    },

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl WadError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a transport error for a request URL
    pub fn request(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Request {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error comes from talking to the object store.
    ///
    /// These never abort a run: a fetch turns into a cache miss and an
    /// upload is logged and dropped.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Request { .. } | Self::HttpStatus { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheDisabled => {
                Some("Set WAD_S3_CREDENTIALS= and WAD_S3_BUCKET_NAME= for caching")
            }
            Self::InvalidCredentials => Some("Use the form WAD_S3_CREDENTIALS=AKIA...:secret"),
            Self::Request { .. } | Self::HttpStatus { .. } => Some("Debug with `wad -v`"),
            Self::ExternalProcess { .. } => Some("Please review the logs above"),
            _ => None,
        }
    }
}
