//! Runtime state for the packetgov kernel.
//!
//! The state file is the single mutable document of the system: packet
//! runtime records, the append-only activity log (optionally hash-chained),
//! area closeouts, and the cached expanded dependency graph. This crate
//! owns its schema, the status normalization layer that absorbs legacy
//! vocabularies, and the migration chain that brings old files forward.

pub mod log_integrity;
pub mod migrations;
pub mod model;
pub mod status;
pub mod store;

pub use log_integrity::{LogMode, append_event, compute_entry_hash, verify_log};
pub use model::{ActivityEvent, AreaCloseout, Handover, PacketRuntime, RuntimeState};
pub use status::PacketStatus;
pub use store::{CURRENT_SCHEMA_VERSION, STATE_VERSION, StateError, StateStore};
