//! packetgov - governed work-packet orchestration kernel.
//!
//! A tamper-evident state machine that mediates every lifecycle transition
//! of work packets against a shared work-breakdown structure: deterministic
//! supervisor policy in front of every mutation, atomic persistence, and a
//! per-packet hash-chained commit ledger that can be independently
//! re-verified.

pub mod cli;
pub mod exit_codes;
pub mod hints;
pub mod server;

// Core types and operations re-exported for external consumers.
pub use packetgov_engine::{
    AuditMirror, Briefing, BundleLimits, ContextBundle, Engine, EngineError, IntegrityMode,
    IntegrityReport, JsonlMirror, TransitionOutcome,
};
pub use packetgov_policy::{NoopSupervisor, Supervisor, TransitionRequest, Verdict};
pub use packetgov_state::{PacketStatus, RuntimeState};
pub use packetgov_wbs::WbsDefinition;
