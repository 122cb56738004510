//! Content-addressed cache keys
//!
//! A key is the SHA256 of the platform fingerprint, the values of the
//! watched environment variables and the contents of the watched files,
//! joined by newlines in that order. Same inputs = same artifact.

use sha2::{Digest, Sha256};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Archive extension shared by the local artifact and the object key
pub const ARTIFACT_EXTENSION: &str = "tar.bz2";

/// Platform component of every key, e.g. `x86_64-linux`
pub fn platform_fingerprint() -> String {
    format!("{}-{}", env::consts::ARCH, env::consts::OS)
}

/// Hex digest identifying one set of build inputs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash the current values of `env_vars` and contents of `files`.
    ///
    /// Unset variables and unreadable files contribute an empty segment.
    pub fn compute(fingerprint: &str, env_vars: &[String], files: &[PathBuf]) -> Self {
        let mut segments: Vec<Vec<u8>> = Vec::with_capacity(1 + env_vars.len() + files.len());
        segments.push(fingerprint.as_bytes().to_vec());

        for name in env_vars {
            segments.push(env::var_os(name).unwrap_or_default().into_encoded_bytes());
        }

        for path in files {
            segments.push(read_or_empty(path));
        }

        let mut hasher = Sha256::new();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                hasher.update(b"\n");
            }
            hasher.update(segment);
        }

        let key = Self(hex::encode(hasher.finalize()));
        debug!(
            "Computed cache key {} from {} variables and {} files",
            key,
            env_vars.len(),
            files.len()
        );
        key
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Remote object key, `{digest}.tar.bz2`
    pub fn object_key(&self) -> String {
        format!("{}.{}", self.0, ARTIFACT_EXTENSION)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn read_or_empty(path: &Path) -> Vec<u8> {
    match fs::read(path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!("Not hashing {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
