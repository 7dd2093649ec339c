//! Exit code constants and error kind mapping.
//!
//! Domain failures (caller mistakes) and infra failures (environment) get
//! disjoint codes so scripts can branch on the class alone.

use packetgov_engine::EngineError;

/// Exit code constants for packetgov.
pub mod codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;

    /// CLI arguments error - invalid or missing command-line arguments
    pub const CLI_ARGS: i32 = 2;

    /// Unknown packet or area id
    pub const NOT_FOUND: i32 = 3;

    /// Wrong status, ownership mismatch, or active handover
    pub const PRECONDITION_FAILED: i32 = 4;

    /// A dependency is not done
    pub const BLOCKED_BY_DEPS: i32 = 5;

    /// Supervisor denial
    pub const POLICY_DENIED: i32 = 6;

    /// Chain, journal, or runtime coherence failure
    pub const STATE_INTEGRITY: i32 = 7;

    /// Unknown future schema version or config-lock mismatch
    pub const SCHEMA_MISMATCH: i32 = 8;

    /// State or ledger lock could not be acquired in time
    pub const LOCK_TIMEOUT: i32 = 9;

    /// Filesystem failure
    pub const IO_ERROR: i32 = 74;
}

/// Convert an `EngineError` to `(exit_code, label)`; the label is printed
/// as the `[CODE]` prefix on stderr.
#[must_use]
pub fn error_to_exit_code(error: &EngineError) -> (i32, &'static str) {
    match error {
        EngineError::NotFound { .. } => (codes::NOT_FOUND, "NOT_FOUND"),
        EngineError::PreconditionFailed { .. } => {
            (codes::PRECONDITION_FAILED, "PRECONDITION_FAILED")
        }
        EngineError::BlockedByDeps { .. } => (codes::BLOCKED_BY_DEPS, "BLOCKED_BY_DEPS"),
        EngineError::PolicyDenied { .. } => (codes::POLICY_DENIED, "POLICY_DENIED"),
        EngineError::SchemaMismatch { .. } => (codes::SCHEMA_MISMATCH, "SCHEMA_MISMATCH"),
        EngineError::LockTimeout { .. } => (codes::LOCK_TIMEOUT, "LOCK_TIMEOUT"),
        EngineError::Integrity { .. } => (codes::STATE_INTEGRITY, "STATE_INTEGRITY"),
        EngineError::Io { .. } => (codes::IO_ERROR, "IO_ERROR"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_constants() {
        assert_eq!(codes::SUCCESS, 0);
        assert_eq!(codes::CLI_ARGS, 2);
        assert_eq!(codes::NOT_FOUND, 3);
        assert_eq!(codes::PRECONDITION_FAILED, 4);
        assert_eq!(codes::BLOCKED_BY_DEPS, 5);
        assert_eq!(codes::POLICY_DENIED, 6);
        assert_eq!(codes::STATE_INTEGRITY, 7);
        assert_eq!(codes::SCHEMA_MISMATCH, 8);
        assert_eq!(codes::LOCK_TIMEOUT, 9);
        assert_eq!(codes::IO_ERROR, 74);
    }

    #[test]
    fn domain_errors_map_to_domain_codes() {
        let (code, label) = error_to_exit_code(&EngineError::not_found("x"));
        assert_eq!((code, label), (codes::NOT_FOUND, "NOT_FOUND"));

        let (code, label) = error_to_exit_code(&EngineError::precondition("x"));
        assert_eq!(
            (code, label),
            (codes::PRECONDITION_FAILED, "PRECONDITION_FAILED")
        );

        let (code, _) = error_to_exit_code(&EngineError::BlockedByDeps {
            packet_id: "B".into(),
            blocker: "A".into(),
        });
        assert_eq!(code, codes::BLOCKED_BY_DEPS);
    }

    #[test]
    fn infra_errors_map_to_infra_codes() {
        let (code, _) = error_to_exit_code(&EngineError::LockTimeout {
            message: "timeout".into(),
        });
        assert_eq!(code, codes::LOCK_TIMEOUT);

        let (code, _) = error_to_exit_code(&EngineError::io("disk full"));
        assert_eq!(code, codes::IO_ERROR);
    }
}
