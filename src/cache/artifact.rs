//! Fetch-or-build-and-store orchestration
//!
//! Restores the dependency tree from the object store when an artifact for
//! the current cache key exists; otherwise installs from scratch and
//! publishes a fresh artifact for the next run.
//!
//! Store failures never fail a run; install and unpack failures always do.

use crate::cache::key::CacheKey;
use crate::error::{WadError, WadResult};
use crate::store::{Body, ObjectStore};
use crate::tools::{
    default_install_command, Archiver, Installer, ShellInstaller, TarArchiver,
    DEFAULT_BUNDLE_WITHOUT,
};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Directory under the project root holding the local artifact
pub const ARTIFACT_DIR: &str = "tmp";

/// Content type artifacts are stored with
pub const ARTIFACT_CONTENT_TYPE: &str = "application/x-download";

/// Step of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    ConfigChecked,
    Fetching,
    Fetched,
    Missing,
    Unpacking,
    /// Restored from the store
    Ready,
    Installing,
    Built,
    Packing,
    Packed,
    Uploading,
    /// Built fresh and (attempted to) store it
    Done,
    Failed,
}

/// What is known about the local artifact file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Nothing on disk
    Absent,
    /// Found on disk when the cache was opened
    Present,
    /// Downloaded in this run
    Fetched,
    /// Packed in this run, not stored yet
    Packed,
    /// Stored in this run
    Uploaded,
}

impl ArtifactState {
    /// Whether uploading this artifact would be redundant
    pub fn skips_upload(&self) -> bool {
        matches!(self, Self::Present | Self::Fetched | Self::Uploaded)
    }
}

/// How a full run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// Caching disabled, installed from scratch
    Uncached,
    /// Cache hit, artifact unpacked
    Restored,
    /// Cache miss, installed and tried to store
    Stored(UploadOutcome),
}

/// How an upload attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// Artifact already exists locally from this invocation
    AlreadyPresent,
    /// None of the requested paths exist
    NothingToPack,
    /// Packing or storing failed; the run carries on
    Failed(String),
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploaded => write!(f, "uploaded"),
            Self::AlreadyPresent => write!(f, "already present"),
            Self::NothingToPack => write!(f, "nothing to pack"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Artifact lifecycle for one cache key
pub struct ArtifactCache {
    root: PathBuf,
    key: CacheKey,
    cache_paths: Vec<PathBuf>,
    store: Option<Box<dyn ObjectStore>>,
    archiver: Box<dyn Archiver>,
    installer: Box<dyn Installer>,
    phase: Phase,
    phase_started: Instant,
    artifact: ArtifactState,
}

impl ArtifactCache {
    /// Open the cache for `key` in `root`, archiving `cache_paths`.
    ///
    /// Defaults to `tar` and the default install command, with no store
    /// (caching disabled) until [`with_store`](Self::with_store).
    pub fn new(root: impl Into<PathBuf>, key: CacheKey, cache_paths: Vec<PathBuf>) -> Self {
        let root = root.into();
        let artifact_path = artifact_path(&root, &key);
        let artifact = if artifact_path.exists() {
            debug!("Found existing artifact {}", artifact_path.display());
            ArtifactState::Present
        } else {
            ArtifactState::Absent
        };

        Self {
            archiver: Box::new(TarArchiver::new(&root)),
            installer: Box::new(ShellInstaller::new(
                default_install_command(DEFAULT_BUNDLE_WITHOUT),
                &root,
            )),
            root,
            key,
            cache_paths,
            store: None,
            phase: Phase::Uninitialized,
            phase_started: Instant::now(),
            artifact,
        }
    }

    pub fn with_store(mut self, store: Option<Box<dyn ObjectStore>>) -> Self {
        self.store = store;
        self
    }

    pub fn with_archiver(mut self, archiver: Box<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    pub fn with_installer(mut self, installer: Box<dyn Installer>) -> Self {
        self.installer = installer;
        self
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn artifact_state(&self) -> ArtifactState {
        self.artifact
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// `{root}/tmp/{key}.tar.bz2`
    pub fn artifact_path(&self) -> PathBuf {
        artifact_path(&self.root, &self.key)
    }

    /// Full cycle: restore on hit, otherwise install and store.
    pub fn setup(&mut self) -> WadResult<SetupOutcome> {
        self.enter(Phase::ConfigChecked);

        if !self.is_enabled() {
            info!(
                "No S3 credentials defined. Set WAD_S3_CREDENTIALS= and WAD_S3_BUCKET_NAME= for caching."
            );
            self.install()?;
            return Ok(SetupOutcome::Uncached);
        }

        if self.fetch()? {
            self.unpack()?;
            self.enter(Phase::Ready);
            return Ok(SetupOutcome::Restored);
        }

        self.install()?;
        let upload = self.store_artifact(&[])?;
        self.enter(Phase::Done);
        Ok(SetupOutcome::Stored(upload))
    }

    /// Fetch and unpack only. A miss is an error here.
    pub fn download(&mut self) -> WadResult<()> {
        self.enter(Phase::ConfigChecked);
        if !self.is_enabled() {
            return Err(WadError::CacheDisabled);
        }

        if !self.fetch()? {
            self.enter(Phase::Failed);
            return Err(WadError::ArtifactUnavailable {
                key: self.key.object_key(),
            });
        }

        self.unpack()?;
        self.enter(Phase::Ready);
        Ok(())
    }

    /// Pack and store only, for `paths` or the configured cache paths.
    pub fn upload(&mut self, paths: &[PathBuf]) -> WadResult<UploadOutcome> {
        self.enter(Phase::ConfigChecked);
        if !self.is_enabled() {
            return Err(WadError::CacheDisabled);
        }

        let outcome = self.store_artifact(paths)?;
        self.enter(Phase::Done);
        Ok(outcome)
    }

    /// Download the artifact. `Ok(false)` is a miss.
    ///
    /// Store errors count as a miss; local failures propagate.
    ///
    /// The body goes to a temp file next to the artifact and is only moved
    /// into place once complete, so a failed download never leaves a
    /// partial archive behind.
    pub fn fetch(&mut self) -> WadResult<bool> {
        self.enter(Phase::Fetching);

        match self.try_fetch() {
            Ok(true) => {
                self.artifact = ArtifactState::Fetched;
                self.enter(Phase::Fetched);
                Ok(true)
            }
            Ok(false) => {
                self.enter(Phase::Missing);
                Ok(false)
            }
            Err(e) if e.is_transient() => {
                info!("Could not fetch Wad from S3: {}", e);
                self.enter(Phase::Missing);
                Ok(false)
            }
            Err(e) => {
                self.enter(Phase::Failed);
                Err(e)
            }
        }
    }

    fn try_fetch(&mut self) -> WadResult<bool> {
        let Some(store) = self.store.as_ref() else {
            return Ok(false);
        };

        let path = artifact_path(&self.root, &self.key);
        if path.exists() {
            info!("Removing bundle from filesystem");
            fs::remove_file(&path)
                .map_err(|e| WadError::io(format!("removing {}", path.display()), e))?;
        }
        self.artifact = ArtifactState::Absent;

        let dir = ensure_artifact_dir(&path)?;

        info!("Trying to fetch Wad from S3");
        let mut download = NamedTempFile::new_in(&dir)
            .map_err(|e| WadError::io(format!("creating temp file in {}", dir.display()), e))?;
        store
            .get_to(&self.key.object_key(), &mut download)?
            .error_for_status()?;

        download
            .persist(&path)
            .map_err(|e| WadError::io(format!("moving download to {}", path.display()), e.error))?;
        Ok(true)
    }

    fn unpack(&mut self) -> WadResult<()> {
        self.enter(Phase::Unpacking);
        let path = self.artifact_path();
        let result = self
            .archiver
            .unpack(&path)
            .and_then(|outcome| outcome.into_result("Unpacking artifact"));
        self.fatal(result).map(|_| ())
    }

    fn install(&mut self) -> WadResult<()> {
        self.enter(Phase::Installing);
        let result = self
            .installer
            .install()
            .and_then(|outcome| outcome.into_result("Installing dependencies"));
        self.fatal(result)?;
        self.enter(Phase::Built);
        Ok(())
    }

    fn store_artifact(&mut self, paths: &[PathBuf]) -> WadResult<UploadOutcome> {
        if self.artifact.skips_upload() {
            info!(
                "Artifact {} already exists, not uploading",
                self.key.object_key()
            );
            return Ok(UploadOutcome::AlreadyPresent);
        }

        if self.artifact == ArtifactState::Absent {
            if let Some(outcome) = self.pack(paths) {
                return Ok(outcome);
            }
        }

        self.put()
    }

    /// Pack into the artifact path. `Some` ends the upload early.
    fn pack(&mut self, paths: &[PathBuf]) -> Option<UploadOutcome> {
        self.enter(Phase::Packing);

        let requested: &[PathBuf] = if paths.is_empty() {
            &self.cache_paths
        } else {
            paths
        };
        let sources: Vec<PathBuf> = requested
            .iter()
            .filter(|p| self.root.join(p).exists())
            .cloned()
            .collect();

        if sources.is_empty() {
            info!("Nothing to upload: none of {:?} exist", requested);
            return Some(UploadOutcome::NothingToPack);
        }

        let path = self.artifact_path();
        let result = ensure_artifact_dir(&path)
            .and_then(|_| self.archiver.pack(&path, &sources))
            .and_then(|outcome| outcome.into_result("Packing artifact"));

        match result {
            Ok(_) => {
                self.artifact = ArtifactState::Packed;
                self.enter(Phase::Packed);
                None
            }
            Err(e) => {
                warn!("Failed to create artifact: {}", e);
                if path.exists() {
                    let _ = fs::remove_file(&path);
                }
                Some(UploadOutcome::Failed(e.to_string()))
            }
        }
    }

    fn put(&mut self) -> WadResult<UploadOutcome> {
        self.enter(Phase::Uploading);
        let Some(store) = self.store.as_ref() else {
            return Err(WadError::CacheDisabled);
        };

        info!("Trying to write Wad to S3");
        let path = artifact_path(&self.root, &self.key);
        let result = Body::file(&path)
            .and_then(|body| store.put(&self.key.object_key(), body, Some(ARTIFACT_CONTENT_TYPE)))
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => {
                info!("Wrote Wad to S3");
                self.artifact = ArtifactState::Uploaded;
                Ok(UploadOutcome::Uploaded)
            }
            Err(e) if e.is_transient() => {
                warn!("Failed to write to S3, debug with `wad -v'");
                debug!("Upload error: {}", e);
                Ok(UploadOutcome::Failed(e.to_string()))
            }
            Err(e) => {
                self.enter(Phase::Failed);
                Err(e)
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        debug!(
            "{:?} -> {:?} after {:.2}s",
            self.phase,
            phase,
            self.phase_started.elapsed().as_secs_f64()
        );
        self.phase = phase;
        self.phase_started = Instant::now();
    }

    fn fatal<T>(&mut self, result: WadResult<T>) -> WadResult<T> {
        if result.is_err() {
            self.enter(Phase::Failed);
        }
        result
    }
}

fn artifact_path(root: &Path, key: &CacheKey) -> PathBuf {
    root.join(ARTIFACT_DIR).join(key.object_key())
}

fn ensure_artifact_dir(artifact: &Path) -> WadResult<PathBuf> {
    let dir = artifact
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir)
        .map_err(|e| WadError::io(format!("creating directory {}", dir.display()), e))?;
    Ok(dir)
}
