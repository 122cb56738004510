//! Content-addressed artifact cache
//!
//! Artifacts are keyed by a SHA256 over the platform, selected environment
//! variables and lockfile contents. Same inputs = same artifact.
//!
//! # Run States
//!
//! | Result | Path |
//! |--------|------|
//! | Ready | fetch hit → unpack |
//! | Done | fetch miss → install → pack → upload |
//! | Failed | install or unpack failed |

pub mod artifact;
pub mod key;

pub use artifact::{
    ArtifactCache, ArtifactState, Phase, SetupOutcome, UploadOutcome, ARTIFACT_CONTENT_TYPE,
    ARTIFACT_DIR,
};
pub use key::{platform_fingerprint, CacheKey, ARTIFACT_EXTENSION};
