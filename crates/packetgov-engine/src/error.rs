//! Engine error taxonomy and transition outcomes.
//!
//! The engine boundary is total: every operation returns either an outcome
//! or one of these kinds. Domain kinds (not-found, precondition, blocked,
//! denied, schema) are caller mistakes; infra kinds (lock timeout, IO) are
//! environment failures. Adapters map kinds to exit codes and HTTP statuses.

use thiserror::Error;

use packetgov_dcl::DclError;
use packetgov_state::StateError;
use packetgov_utils::{CanonError, LockError};
use packetgov_wbs::WbsError;

/// Result payload of a successful transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionOutcome {
    /// Human-readable success message.
    pub message: String,
    /// Non-fatal observations (advisory capability warnings, cascade
    /// anomalies).
    pub warnings: Vec<String>,
    /// Packets transitioned to `blocked` by a cascade.
    pub blocked: Vec<String>,
}

impl TransitionOutcome {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            warnings: Vec::new(),
            blocked: Vec::new(),
        }
    }
}

/// Everything a transition or read can fail with.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    PreconditionFailed { message: String },

    #[error("Blocked by {blocker} (not done yet)")]
    BlockedByDeps { packet_id: String, blocker: String },

    #[error("{reason}")]
    PolicyDenied { reason: String },

    #[error("{message}")]
    SchemaMismatch { message: String },

    #[error("{message}")]
    LockTimeout { message: String },

    #[error("{message}")]
    Integrity { message: String },

    #[error("{message}")]
    Io { message: String },
}

impl EngineError {
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn io(err: impl std::fmt::Display) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }

    /// Stable machine-readable kind tag, used for exit codes and JSON output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::PreconditionFailed { .. } => "precondition_failed",
            Self::BlockedByDeps { .. } => "blocked_by_deps",
            Self::PolicyDenied { .. } => "policy_denied",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::LockTimeout { .. } => "lock_timeout",
            Self::Integrity { .. } => "state_integrity",
            Self::Io { .. } => "io_error",
        }
    }
}

impl From<LockError> for EngineError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { .. } => Self::LockTimeout {
                message: err.to_string(),
            },
            LockError::Io(e) => Self::io(e),
        }
    }
}

impl From<StateError> for EngineError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::UnsupportedVersion { .. } => Self::SchemaMismatch {
                message: err.to_string(),
            },
            StateError::Parse(_) => Self::SchemaMismatch {
                message: err.to_string(),
            },
            StateError::Canon(e) => Self::io(e),
            StateError::Io { message } => Self::Io { message },
        }
    }
}

impl From<DclError> for EngineError {
    fn from(err: DclError) -> Self {
        match err {
            DclError::Lock(LockError::Timeout { .. }) => Self::LockTimeout {
                message: err.to_string(),
            },
            DclError::Lock(LockError::Io(e)) => Self::io(e),
            DclError::Canon(e) => Self::io(e),
            DclError::Io { message } => Self::Io { message },
        }
    }
}

impl From<WbsError> for EngineError {
    fn from(err: WbsError) -> Self {
        match err {
            WbsError::NotFound { .. } => Self::NotFound {
                message: err.to_string(),
            },
            WbsError::Parse(_) => Self::SchemaMismatch {
                message: err.to_string(),
            },
            WbsError::DuplicatePacketId { .. }
            | WbsError::DuplicateAreaId { .. }
            | WbsError::UnknownDependency { .. }
            | WbsError::CircularDependency { .. } => Self::Integrity {
                message: err.to_string(),
            },
            WbsError::Io(e) => Self::io(e),
        }
    }
}

impl From<CanonError> for EngineError {
    fn from(err: CanonError) -> Self {
        Self::io(err)
    }
}
