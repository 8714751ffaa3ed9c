//! Loaded configuration plus the state store it points at.
//!
//! Read-only commands restore the engine with [`Context::engine`]. Commands
//! that write go through [`Context::begin`], which holds the store lock from
//! load until the [`Session`] is dropped, so concurrent runs apply one after
//! the other instead of overwriting each other's snapshot.

use super::config::ExedaoConfig;
use exedao::governance::{PolicyEngine, SystemClock};
use exedao::store::{StateLock, StateStore};
use std::path::{Path, PathBuf};

pub struct Context {
    pub config_path: PathBuf,
    pub config: ExedaoConfig,
    pub store: StateStore,
}

impl Context {
    /// Load an existing config file.
    pub fn load(config_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !config_path.exists() {
            return Err(format!(
                "No config file at '{}'. Run `exedao init` first.",
                config_path.display()
            )
            .into());
        }
        let config = ExedaoConfig::load(config_path)?;
        let store = StateStore::new(config.store.state_path.clone());
        Ok(Self {
            config_path: config_path.to_path_buf(),
            config,
            store,
        })
    }

    /// Restore the engine from the state snapshot for reading.
    pub fn engine(&self) -> Result<PolicyEngine<SystemClock>, Box<dyn std::error::Error>> {
        let state = self.store.load()?;
        Ok(PolicyEngine::from_state(state, SystemClock))
    }

    /// Lock the store and restore the engine for a write.
    pub fn begin(&self) -> Result<Session<'_>, Box<dyn std::error::Error>> {
        let lock = self.store.lock()?;
        let engine = self.engine()?;
        Ok(Session {
            store: &self.store,
            engine,
            _lock: lock,
        })
    }
}

/// Engine loaded under the store lock.
pub struct Session<'a> {
    store: &'a StateStore,
    pub engine: PolicyEngine<SystemClock>,
    _lock: StateLock,
}

impl Session<'_> {
    /// Write the engine state back to the snapshot.
    pub fn persist(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.store.save(self.engine.state())?;
        Ok(())
    }
}
