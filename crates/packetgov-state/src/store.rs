//! Versioned state storage.
//!
//! Load sequence: read JSON, run the migration chain until the schema is
//! current, normalize statuses and log mode (handled by the model's
//! deserializers), and return. A migrated document is persisted before the
//! caller sees it, so migration is observed atomically.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use packetgov_utils::{
    CanonError, atomic_write_json, atomic_write_json_locked, atomic_write::read_json_opt, now_utc,
};

use crate::model::RuntimeState;

/// Envelope version of the state file format.
pub const STATE_VERSION: &str = "1.0";

/// Current explicit schema version; loads migrate until they reach it.
pub const CURRENT_SCHEMA_VERSION: &str = "1.1";

/// Errors from loading or saving runtime state.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("unsupported state schema version: {version}")]
    UnsupportedVersion { version: String },

    #[error("failed to parse state file: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("canonicalization failure: {0}")]
    Canon(#[from] CanonError),

    #[error("state IO failure: {message}")]
    Io { message: String },
}

impl StateError {
    pub(crate) fn io(err: impl std::fmt::Display) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Version-aware state storage and migration entrypoint.
#[derive(Debug, Clone)]
pub struct StateStore {
    state_path: Utf8PathBuf,
}

impl StateStore {
    #[must_use]
    pub fn new(state_path: Utf8PathBuf) -> Self {
        Self { state_path }
    }

    /// Path of the state file (also the lock target for mutations).
    #[must_use]
    pub fn state_path(&self) -> &Utf8Path {
        &self.state_path
    }

    /// Fresh state for a project with no history.
    #[must_use]
    pub fn default_state() -> RuntimeState {
        let now = now_utc();
        RuntimeState {
            version: STATE_VERSION.to_string(),
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            created_at: now.clone(),
            updated_at: now,
            packets: Default::default(),
            log: Vec::new(),
            area_closeouts: Default::default(),
            log_integrity_mode: Default::default(),
            expanded_dependencies: Default::default(),
        }
    }

    /// Load the state, migrating old documents forward.
    pub fn load(&self) -> Result<RuntimeState, StateError> {
        let Some(mut value) =
            read_json_opt::<Value>(&self.state_path).map_err(StateError::io)?
        else {
            return Ok(Self::default_state());
        };

        let applied = crate::migrations::run(&mut value)?;

        let state: RuntimeState = serde_json::from_value(value).map_err(StateError::Parse)?;

        if !applied.is_empty() {
            for step in &applied {
                info!(from = %step.from, to = %step.to, name = %step.name, "state migrated");
            }
            // Persist the upgraded document before the caller observes it.
            atomic_write_json(&self.state_path, &state).map_err(StateError::io)?;
        }

        Ok(state)
    }

    /// Persist the state atomically, acquiring the state lock.
    pub fn save(&self, state: &mut RuntimeState) -> Result<(), StateError> {
        self.stamp(state);
        atomic_write_json(&self.state_path, state).map_err(StateError::io)
    }

    /// Persist the state atomically when the caller already holds the lock.
    pub fn save_locked(&self, state: &mut RuntimeState) -> Result<(), StateError> {
        self.stamp(state);
        atomic_write_json_locked(&self.state_path, state).map_err(StateError::io)
    }

    fn stamp(&self, state: &mut RuntimeState) {
        if state.version.is_empty() {
            state.version = STATE_VERSION.to_string();
        }
        state.schema_version = CURRENT_SCHEMA_VERSION.to_string();
        state.updated_at = now_utc();
    }
}
