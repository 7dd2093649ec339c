//! Integrity service: full verification plus config-lock validation.
//!
//! Order of checks: config lock, journal recovery, per-packet DCL chains
//! (full mode adds runtime coherence), activity log chain. The report is a
//! single structured document adapters can render or serve.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use packetgov_dcl::{DclConfig, JournalRecovery, validate_config_lock};
use packetgov_state::verify_log;
use packetgov_utils::paths;

use crate::engine::Engine;
use crate::error::EngineError;

/// Verification depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityMode {
    /// Structural: chains, journals, config lock.
    Fast,
    /// Structural plus runtime-state coherence against packet HEADs.
    Full,
}

impl IntegrityMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Full => "full",
        }
    }
}

/// Config-lock section of the report.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigLockReport {
    pub ok: bool,
    pub issues: Vec<String>,
}

/// Journal-recovery section of the report.
#[derive(Debug, Clone, Serialize)]
pub struct JournalRecoveryReport {
    pub ok: bool,
    pub recovered: Vec<JournalRecovery>,
    pub issues: Vec<String>,
}

/// The full integrity verdict.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub ok: bool,
    pub mode: String,
    pub packet_count: usize,
    pub packets_checked: usize,
    pub commits_verified: usize,
    pub integrity_errors: Vec<String>,
    pub config_lock: ConfigLockReport,
    pub journal_recovery: JournalRecoveryReport,
    pub verification_issues: BTreeMap<String, Vec<String>>,
}

impl Engine {
    /// Run the integrity service at the requested depth.
    pub fn verify_integrity(&self, mode: IntegrityMode) -> Result<IntegrityReport, EngineError> {
        let mut integrity_errors = Vec::new();

        // (a) config lock against the runtime state's schema.
        let state = self.load_state()?;
        let config = DclConfig::load(&paths::dcl_config_path(self.root()))
            .map_err(EngineError::io)?;
        let config_issues = validate_config_lock(&config, &state.schema_version);
        let config_lock = ConfigLockReport {
            ok: config_issues.is_empty(),
            issues: config_issues.clone(),
        };
        integrity_errors.extend(config_issues);

        // (b) journal recovery.
        let recovery_reports = self.ledger().recover_all_journals()?;
        let recovery_issues: Vec<String> = recovery_reports
            .iter()
            .filter(|r| r.status == "blocked")
            .map(|r| {
                format!(
                    "journal recovery blocked for {}: {}",
                    r.packet_id,
                    r.issue.as_deref().unwrap_or("unknown")
                )
            })
            .collect();
        let journal_recovery = JournalRecoveryReport {
            ok: recovery_issues.is_empty(),
            recovered: recovery_reports,
            issues: recovery_issues.clone(),
        };
        integrity_errors.extend(recovery_issues);

        // (c) per-packet DCL chains.
        let state_packets: BTreeMap<String, Value> = match mode {
            IntegrityMode::Fast => BTreeMap::new(),
            IntegrityMode::Full => state
                .packets
                .iter()
                .map(|(id, packet)| (id.clone(), packet.snapshot()))
                .chain(state.area_closeouts.iter().map(|(area_id, closeout)| {
                    (
                        format!("AREA-{area_id}"),
                        serde_json::to_value(closeout).unwrap_or(Value::Null),
                    )
                }))
                .collect(),
        };
        let (chains_ok, details) = self.ledger().verify_all_detailed(&state_packets)?;
        let packets_checked = details.len();
        let commits_verified = details.values().map(|d| d.checked_commits).sum();
        let verification_issues: BTreeMap<String, Vec<String>> = details
            .into_iter()
            .filter(|(_, detail)| !detail.issues.is_empty())
            .map(|(packet_id, detail)| (packet_id, detail.issues))
            .collect();
        if !chains_ok {
            for (packet_id, issues) in &verification_issues {
                for issue in issues {
                    integrity_errors.push(format!("{packet_id}: {issue}"));
                }
            }
        }

        // (d) activity log chain.
        let (log_ok, log_issues) = verify_log(&state.log);
        if !log_ok {
            integrity_errors.extend(log_issues);
        }

        Ok(IntegrityReport {
            ok: integrity_errors.is_empty(),
            mode: mode.as_str().to_string(),
            packet_count: state.packets.len(),
            packets_checked,
            commits_verified,
            integrity_errors,
            config_lock,
            journal_recovery,
            verification_issues,
        })
    }
}
