//! Deterministic Commit Ledger (DCL).
//!
//! Every packet carries an append-only, hash-chained sequence of commits.
//! A commit binds the action envelope, the pre/post runtime snapshots, the
//! governing constitution version, and its predecessor into one SHA-256
//! over canonical JSON. Writes are crash-safe through a two-phase journal;
//! HEAD advances forward only; verification recomputes everything from the
//! stored bytes.

pub mod bundle;
pub mod checkpoint;
pub mod commit;
pub mod config_lock;
pub mod ledger;

pub use bundle::{export_proof_bundle, verify_proof_bundle};
pub use checkpoint::{Checkpoint, collect_packet_heads, write_project_checkpoint};
pub use commit::{
    ActionEnvelope, Actor, DclCommit, GENESIS, Head, Journal, VerifyDetail, build_diff,
    verify_chain,
};
pub use config_lock::{DclConfig, validate_config_lock};
pub use ledger::{CommitRequest, DclError, JournalRecovery, Ledger};

/// Hash algorithm pinned by the config lock.
pub const HASH_ALGORITHM: &str = "sha256";

/// Ledger schema version pinned by the config lock.
pub const DCL_SCHEMA_VERSION: &str = "1.0";
