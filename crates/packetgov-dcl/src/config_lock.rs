//! DCL configuration lock (`dcl-config.json`).
//!
//! The lock pins the hashing contract: algorithm, canonicalization version,
//! ledger schema version, and the runtime state schema it was written
//! against. A deployed lock must match the kernel's built-in expectations
//! exactly or integrity verification fails.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use packetgov_utils::atomic_write::read_json_opt;
use packetgov_utils::canon::CANONICALIZATION_VERSION;

use crate::{DCL_SCHEMA_VERSION, HASH_ALGORITHM};

/// The configuration lock document. Absent fields take the built-in pins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DclConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
    #[serde(default = "default_canonicalization_version")]
    pub canonicalization_version: String,
    #[serde(default = "default_dcl_version")]
    pub dcl_version: String,
    #[serde(default)]
    pub state_schema_version: String,
}

fn default_enabled() -> bool {
    true
}
fn default_mode() -> String {
    "dcl".to_string()
}
fn default_hash_algorithm() -> String {
    HASH_ALGORITHM.to_string()
}
fn default_canonicalization_version() -> String {
    CANONICALIZATION_VERSION.to_string()
}
fn default_dcl_version() -> String {
    DCL_SCHEMA_VERSION.to_string()
}

impl Default for DclConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: default_mode(),
            hash_algorithm: default_hash_algorithm(),
            canonicalization_version: default_canonicalization_version(),
            dcl_version: default_dcl_version(),
            state_schema_version: String::new(),
        }
    }
}

impl DclConfig {
    /// Load the lock; a missing file yields the built-in defaults.
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        Ok(read_json_opt(path)?.unwrap_or_default())
    }
}

/// Validate a config lock against the kernel's expectations.
///
/// Returns the list of mismatches; empty means valid. The state schema is
/// only checked when both sides declare one.
#[must_use]
pub fn validate_config_lock(config: &DclConfig, expected_state_schema: &str) -> Vec<String> {
    let mut issues = Vec::new();

    if config.mode.trim().to_lowercase() != "dcl" {
        issues.push(format!("dcl-config mode must be 'dcl' (found: {})", config.mode));
    }
    if config.hash_algorithm.trim().to_lowercase() != HASH_ALGORITHM {
        issues.push(format!(
            "dcl-config hash_algorithm mismatch (expected {HASH_ALGORITHM}, found {})",
            config.hash_algorithm
        ));
    }
    if config.canonicalization_version.trim() != CANONICALIZATION_VERSION {
        issues.push(format!(
            "dcl-config canonicalization_version mismatch (expected {CANONICALIZATION_VERSION}, found {})",
            config.canonicalization_version
        ));
    }
    if config.dcl_version.trim() != DCL_SCHEMA_VERSION {
        issues.push(format!(
            "dcl-config dcl_version mismatch (expected {DCL_SCHEMA_VERSION}, found {})",
            config.dcl_version
        ));
    }
    if !expected_state_schema.is_empty() {
        let actual = config.state_schema_version.trim();
        if !actual.is_empty() && actual != expected_state_schema.trim() {
            issues.push(format!(
                "dcl-config state_schema_version mismatch (expected {expected_state_schema}, found {actual})"
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let config = DclConfig::default();
        assert!(validate_config_lock(&config, "").is_empty());
        assert!(validate_config_lock(&config, "1.1").is_empty());
    }

    #[test]
    fn declared_matching_state_schema_is_valid() {
        let config = DclConfig {
            state_schema_version: "1.1".to_string(),
            ..Default::default()
        };
        assert!(validate_config_lock(&config, "1.1").is_empty());
    }

    #[test]
    fn wrong_mode_is_rejected() {
        let config = DclConfig {
            mode: "plain".to_string(),
            ..Default::default()
        };
        let issues = validate_config_lock(&config, "");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("mode must be 'dcl'"));
    }

    #[test]
    fn wrong_hash_algorithm_is_rejected() {
        let config = DclConfig {
            hash_algorithm: "blake3".to_string(),
            ..Default::default()
        };
        let issues = validate_config_lock(&config, "");
        assert!(issues[0].contains("hash_algorithm mismatch"));
        assert!(issues[0].contains("expected sha256"));
    }

    #[test]
    fn wrong_versions_are_rejected() {
        let config = DclConfig {
            canonicalization_version: "2.0".to_string(),
            dcl_version: "0.9".to_string(),
            ..Default::default()
        };
        let issues = validate_config_lock(&config, "");
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn state_schema_drift_is_rejected() {
        let config = DclConfig {
            state_schema_version: "1.0".to_string(),
            ..Default::default()
        };
        let issues = validate_config_lock(&config, "1.1");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("state_schema_version mismatch"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("dcl-config.json")).unwrap();
        let config = DclConfig::load(&path).unwrap();
        assert!(validate_config_lock(&config, "1.1").is_empty());
    }

    #[test]
    fn partial_file_merges_defaults() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("dcl-config.json")).unwrap();
        std::fs::write(path.as_std_path(), r#"{"state_schema_version": "1.1"}"#).unwrap();

        let config = DclConfig::load(&path).unwrap();
        assert_eq!(config.hash_algorithm, "sha256");
        assert_eq!(config.state_schema_version, "1.1");
        assert!(validate_config_lock(&config, "1.1").is_empty());
    }
}
