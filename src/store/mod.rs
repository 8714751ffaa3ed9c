//! Snapshot persistence for governance state.
//!
//! The whole [`GovernanceState`] is written as one CBOR snapshot. Saves go to
//! a sibling temporary file that is then renamed over the snapshot, so a
//! reader sees either the old or the new state, never a torn write.
//!
//! Load-modify-save cycles from separate processes are serialized through a
//! sibling lock file created with `create_new`. Holding a [`StateLock`]
//! across load and save gives every submission a place in one total order.

use crate::governance::engine::{GovernanceState, SCHEMA_VERSION};
use crate::serialization::{from_cbor, to_cbor, SerializationError};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// How long [`StateStore::lock`] waits for another process.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_RETRY: Duration = Duration::from_millis(25);

/// Snapshot store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("snapshot encoding error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("no governance state at '{0}'. Run `exedao init` first.")]
    NotInitialized(PathBuf),

    #[error("governance state already exists at '{0}'. Use --force to overwrite.")]
    AlreadyInitialized(PathBuf),

    #[error("snapshot schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u64, supported: u64 },

    #[error("state is locked by another process ('{0}'). Remove the file if no exedao process is running.")]
    Locked(PathBuf),
}

/// Exclusive hold on a snapshot. Released on drop.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl StateLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release state lock");
        }
    }
}

/// CBOR snapshot at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the snapshot.
    pub fn load(&self) -> Result<GovernanceState, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotInitialized(self.path.clone()))
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let state: GovernanceState = from_cbor(&bytes)?;
        if state.schema_version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: state.schema_version,
                supported: SCHEMA_VERSION,
            });
        }

        debug!(path = %self.path.display(), bytes = bytes.len(), "state loaded");
        Ok(state)
    }

    /// Write the first snapshot. Refuses to overwrite unless `force`.
    pub fn create(&self, state: &GovernanceState, force: bool) -> Result<(), StoreError> {
        if self.exists() && !force {
            return Err(StoreError::AlreadyInitialized(self.path.clone()));
        }
        self.save(state)
    }

    /// Replace the snapshot.
    pub fn save(&self, state: &GovernanceState) -> Result<(), StoreError> {
        let bytes = to_cbor(state)?;
        self.ensure_parent()?;

        let tmp = self.tmp_path();
        fs::write(&tmp, &bytes).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "state saved");
        Ok(())
    }

    /// Take the exclusive lock, waiting up to [`LOCK_TIMEOUT`].
    pub fn lock(&self) -> Result<StateLock, StoreError> {
        self.lock_with_timeout(LOCK_TIMEOUT)
    }

    /// Take the exclusive lock, waiting up to `timeout`.
    pub fn lock_with_timeout(&self, timeout: Duration) -> Result<StateLock, StoreError> {
        self.ensure_parent()?;
        let path = self.sibling("lock");
        let deadline = Instant::now() + timeout;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    // Owner pid is informational only.
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!(path = %path.display(), "state lock acquired");
                    return Ok(StateLock { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(StoreError::Locked(path));
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }
    }

    fn ensure_parent(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        self.sibling("tmp")
    }

    fn sibling(&self, extension: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(extension);
        self.path.with_file_name(name)
    }
}
