//! The packetgov lifecycle engine.
//!
//! The engine is the sole mutator of runtime state. Every mutation runs the
//! same envelope: acquire the state lock, load, ask the supervisor, validate
//! preconditions, compute the post state, append the activity event, write
//! the ledger commit, persist atomically, release, then notify the optional
//! audit mirror. Reads never take the write lock.

pub mod engine;
pub mod error;
pub mod integrity;
pub mod mirror;
pub mod reads;

pub use engine::Engine;
pub use error::{EngineError, TransitionOutcome};
pub use integrity::{IntegrityMode, IntegrityReport};
pub use mirror::{AuditMirror, JsonlMirror};
pub use reads::{Briefing, BundleLimits, ContextBundle, ReadyPacket};
