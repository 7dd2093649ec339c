//! Activity log integrity modes and hash-chain verification.
//!
//! In `hash_chain` mode every appended entry carries a monotone
//! `evt-NNNNNNNN` id, the hash of the previous hashed entry, and its own
//! SHA-256 over the canonical JSON of its descriptive fields. Plain entries
//! may precede the first hashed entry (pre-upgrade history) and are skipped
//! by the verifier.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;

use packetgov_utils::{CanonError, sha256_hex};

use crate::model::ActivityEvent;

/// Activity log integrity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    #[default]
    Plain,
    HashChain,
}

impl LogMode {
    /// Normalize mode aliases; unknown values fall back to `Plain`.
    #[must_use]
    pub fn normalize(value: &str) -> Self {
        let token = value.trim().to_lowercase().replace([' ', '-'], "_");
        match token.as_str() {
            "hash" | "hash_chain" | "tamper_evident" => Self::HashChain,
            _ => Self::Plain,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::HashChain => "hash_chain",
        }
    }
}

impl Serialize for LogMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::normalize(&raw))
    }
}

/// Hash of one log entry's descriptive payload.
///
/// The payload shape is fixed; absent agent/notes hash as nulls so the
/// chain stays stable across serialization round-trips.
pub fn compute_entry_hash(entry: &ActivityEvent) -> Result<String, CanonError> {
    let payload = json!({
        "packet_id": entry.packet_id,
        "event": entry.event,
        "agent": entry.agent,
        "timestamp": entry.timestamp,
        "notes": entry.notes,
        "event_id": entry.event_id,
        "prev_hash": entry.prev_hash,
    });
    sha256_hex(&payload)
}

/// Append an event to the log, chaining it when the mode requires.
pub fn append_event(
    log: &mut Vec<ActivityEvent>,
    mode: LogMode,
    mut entry: ActivityEvent,
) -> Result<(), CanonError> {
    if mode == LogMode::HashChain {
        let hashed: Vec<&ActivityEvent> = log.iter().filter(|e| e.hash.is_some()).collect();
        let prev_hash = hashed
            .last()
            .and_then(|e| e.hash.clone())
            .unwrap_or_default();
        let hash_index = hashed.len() + 1;

        entry.event_id = Some(format!("evt-{hash_index:08}"));
        entry.prev_hash = Some(prev_hash);
        entry.hash = Some(compute_entry_hash(&entry)?);
    }
    log.push(entry);
    Ok(())
}

/// Scan the log in order and verify the hash chain.
///
/// Plain entries are skipped; every hashed entry must carry a sequential
/// `event_id`, link to the previous hashed entry, and recompute to its own
/// stored hash. Partial chain fields on any entry are fatal.
#[must_use]
pub fn verify_log(entries: &[ActivityEvent]) -> (bool, Vec<String>) {
    let mut issues = Vec::new();
    let mut last_hash = String::new();
    let mut hashed_count = 0usize;

    for (idx, entry) in entries.iter().enumerate() {
        if entry.has_any_chain_field() && !entry.has_all_chain_fields() {
            issues.push(format!(
                "log[{idx}] has partial hash-chain fields (requires event_id, prev_hash, hash)"
            ));
            continue;
        }
        if !entry.has_all_chain_fields() {
            continue;
        }

        hashed_count += 1;
        let expected_event_id = format!("evt-{hashed_count:08}");
        if entry.event_id.as_deref() != Some(expected_event_id.as_str()) {
            issues.push(format!(
                "log[{idx}] event_id mismatch (expected {expected_event_id}, got {:?})",
                entry.event_id
            ));
        }

        if entry.prev_hash.as_deref().unwrap_or_default() != last_hash {
            issues.push(format!("log[{idx}] prev_hash mismatch"));
        }

        match compute_entry_hash(entry) {
            Ok(expected_hash) => {
                if entry.hash.as_deref() != Some(expected_hash.as_str()) {
                    issues.push(format!("log[{idx}] hash mismatch"));
                }
            }
            Err(e) => issues.push(format!("log[{idx}] hash recomputation failed: {e}")),
        }

        if let Some(hash) = &entry.hash {
            last_hash = hash.clone();
        }
    }

    (issues.is_empty(), issues)
}
