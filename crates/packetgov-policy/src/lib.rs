//! Authorization policy for packet transitions.
//!
//! A supervisor is a deterministic filter applied before every mutating
//! transition: a pure function of the request and the agent registry
//! snapshot. Role-based authorization for the HTTP surface lives here too.

pub mod rbac;
pub mod registry;
pub mod supervisor;

pub use rbac::role_allows;
pub use registry::{AgentProfile, AgentRegistry, EnforcementMode};
pub use supervisor::{
    DeterministicSupervisor, NoopSupervisor, Supervisor, TransitionRequest, Verdict,
};
