//! Commit model, diff building, and chain verification.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

use packetgov_utils::{CanonError, sha256_hex};

/// Sentinel predecessor hash for the first commit of a chain.
pub const GENESIS: &str = "GENESIS";

/// Who performed an action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub kind: String,
    pub id: String,
}

/// The action half of a commit: what was requested, by whom, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub r#type: String,
    pub name: String,
    pub actor: Actor,
    pub reason: String,
    pub inputs: Value,
    pub timestamp: String,
}

impl ActionEnvelope {
    /// Build a transition envelope. An empty actor id records as `system`.
    #[must_use]
    pub fn transition(action: &str, actor: &str, inputs: Value, reason: &str) -> Self {
        let actor_id = if actor.trim().is_empty() {
            "system"
        } else {
            actor
        };
        Self {
            r#type: "transition".to_string(),
            name: action.to_string(),
            actor: Actor {
                kind: "agent".to_string(),
                id: actor_id.to_string(),
            },
            reason: reason.to_string(),
            inputs,
            timestamp: packetgov_utils::now_utc(),
        }
    }
}

/// One immutable ledger commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DclCommit {
    pub commit_id: String,
    pub packet_id: String,
    pub seq: u64,
    pub prev_commit_hash: String,
    pub action_hash: String,
    pub pre_state_hash: String,
    pub post_state_hash: String,
    pub constitution_hash: String,
    pub diff: Value,
    pub created_at: String,
    pub action_envelope: ActionEnvelope,
    pub commit_hash: String,
}

impl DclCommit {
    /// Recompute this commit's hash from its stored fields.
    ///
    /// The hash covers the whole commit minus the `commit_hash` field
    /// itself.
    pub fn recompute_hash(&self) -> Result<String, CanonError> {
        let mut value = serde_json::to_value(self).map_err(CanonError::ToValue)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("commit_hash");
        }
        sha256_hex(&value)
    }
}

/// Latest committed position of a packet chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Head {
    pub seq: u64,
    pub commit_hash: String,
}

impl Default for Head {
    fn default() -> Self {
        Self {
            seq: 0,
            commit_hash: GENESIS.to_string(),
        }
    }
}

/// Transient two-phase marker written around a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    pub stage: String,
    pub seq: u64,
    pub commit_hash: String,
}

/// Top-level diff between two packet snapshots.
///
/// Shape: `{changed: {key: {from, to}}, added: {key: value},
/// removed: {key: value}}` over the union of top-level keys.
#[must_use]
pub fn build_diff(before: &Value, after: &Value) -> Value {
    let empty = Map::new();
    let before_map = before.as_object().unwrap_or(&empty);
    let after_map = after.as_object().unwrap_or(&empty);

    let mut changed = Map::new();
    let mut added = Map::new();
    let mut removed = Map::new();

    let keys: BTreeSet<&String> = before_map.keys().chain(after_map.keys()).collect();
    for key in keys {
        match (before_map.get(key), after_map.get(key)) {
            (None, Some(after_value)) => {
                added.insert(key.clone(), after_value.clone());
            }
            (Some(before_value), None) => {
                removed.insert(key.clone(), before_value.clone());
            }
            (Some(before_value), Some(after_value)) if before_value != after_value => {
                changed.insert(
                    key.clone(),
                    json!({"from": before_value, "to": after_value}),
                );
            }
            _ => {}
        }
    }

    json!({"changed": changed, "added": added, "removed": removed})
}

/// Detailed verification result for one packet chain.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyDetail {
    pub packet_id: String,
    pub commit_count: usize,
    pub checked_commits: usize,
    pub issues: Vec<String>,
    pub head: Head,
}

impl VerifyDetail {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Verify a commit sequence against its HEAD and, optionally, the live
/// runtime snapshot of the packet.
///
/// Checks, per commit: ordinal seq, duplicate seq values, `action_hash`
/// recomputation, `commit_hash` recomputation, genesis/predecessor links,
/// and the pre/post state chain. Then HEAD seq + hash against the last
/// commit, and runtime coherence when a snapshot is supplied.
#[must_use]
pub fn verify_chain(
    packet_id: &str,
    commits: &[DclCommit],
    head: &Head,
    state_packet: Option<&Value>,
) -> VerifyDetail {
    let mut detail = VerifyDetail {
        packet_id: packet_id.to_string(),
        commit_count: commits.len(),
        checked_commits: 0,
        issues: Vec::new(),
        head: head.clone(),
    };

    if commits.is_empty() {
        if state_packet.is_some() {
            detail.issues.push(format!(
                "missing DCL commits for packet with runtime state: {packet_id}"
            ));
        }
        return detail;
    }

    let mut prev_commit: Option<&DclCommit> = None;
    let mut seen_seq = BTreeSet::new();
    for (idx, commit) in commits.iter().enumerate() {
        detail.checked_commits += 1;
        let expected_seq = (idx + 1) as u64;

        if !seen_seq.insert(commit.seq) {
            detail
                .issues
                .push(format!("duplicate seq value at {packet_id}: {}", commit.seq));
        }
        if commit.seq != expected_seq {
            detail.issues.push(format!(
                "seq mismatch at {packet_id}#{idx}: expected {expected_seq}"
            ));
        }

        match sha256_hex(&commit.action_envelope) {
            Ok(expected) if expected == commit.action_hash => {}
            Ok(_) => detail
                .issues
                .push(format!("action_hash mismatch at {packet_id}#{}", commit.seq)),
            Err(e) => detail.issues.push(format!(
                "action_hash recomputation failed at {packet_id}#{}: {e}",
                commit.seq
            )),
        }

        match commit.recompute_hash() {
            Ok(expected) if expected == commit.commit_hash => {}
            Ok(_) => detail
                .issues
                .push(format!("commit_hash mismatch at {packet_id}#{}", commit.seq)),
            Err(e) => detail.issues.push(format!(
                "commit_hash recomputation failed at {packet_id}#{}: {e}",
                commit.seq
            )),
        }

        match prev_commit {
            None => {
                if commit.prev_commit_hash != GENESIS {
                    detail.issues.push(format!(
                        "genesis prev_commit_hash mismatch at {packet_id}#{}",
                        commit.seq
                    ));
                }
            }
            Some(prev) => {
                if commit.prev_commit_hash != prev.commit_hash {
                    detail.issues.push(format!(
                        "prev_commit_hash mismatch at {packet_id}#{}",
                        commit.seq
                    ));
                }
                if commit.pre_state_hash != prev.post_state_hash {
                    detail.issues.push(format!(
                        "pre/post state chain mismatch at {packet_id}#{}",
                        commit.seq
                    ));
                }
            }
        }
        prev_commit = Some(commit);
    }

    let last = commits.last().expect("non-empty checked above");
    if head.seq != last.seq {
        detail.issues.push(format!(
            "HEAD seq mismatch at {packet_id}: head={} last={}",
            head.seq, last.seq
        ));
    }
    if head.commit_hash != last.commit_hash {
        detail.issues.push(format!(
            "HEAD hash mismatch at {packet_id}: head={} last={}",
            head.commit_hash, last.commit_hash
        ));
    }

    if let Some(snapshot) = state_packet {
        match sha256_hex(snapshot) {
            Ok(current_hash) => {
                if last.post_state_hash != current_hash {
                    detail.issues.push(format!(
                        "runtime state mismatch at {packet_id}: state_hash != HEAD.post_state_hash"
                    ));
                }
            }
            Err(e) => detail
                .issues
                .push(format!("runtime state hash failed at {packet_id}: {e}")),
        }
    }

    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_classifies_changes() {
        let before = json!({"status": "pending", "notes": null, "gone": 1});
        let after = json!({"status": "in_progress", "notes": null, "fresh": true});
        let diff = build_diff(&before, &after);

        assert_eq!(diff["changed"]["status"]["from"], "pending");
        assert_eq!(diff["changed"]["status"]["to"], "in_progress");
        assert_eq!(diff["added"]["fresh"], true);
        assert_eq!(diff["removed"]["gone"], 1);
        assert!(diff["changed"].get("notes").is_none());
    }

    #[test]
    fn diff_of_identical_snapshots_is_empty() {
        let value = json!({"a": 1, "b": [1, 2]});
        let diff = build_diff(&value, &value);
        assert!(diff["changed"].as_object().unwrap().is_empty());
        assert!(diff["added"].as_object().unwrap().is_empty());
        assert!(diff["removed"].as_object().unwrap().is_empty());
    }

    #[test]
    fn envelope_records_system_for_empty_actor() {
        let envelope = ActionEnvelope::transition("reset", "", json!({}), "");
        assert_eq!(envelope.actor.id, "system");
        assert_eq!(envelope.actor.kind, "agent");
        assert_eq!(envelope.r#type, "transition");
        assert!(envelope.timestamp.ends_with('Z'));
    }

    #[test]
    fn default_head_is_genesis() {
        let head = Head::default();
        assert_eq!(head.seq, 0);
        assert_eq!(head.commit_hash, GENESIS);
    }

    #[test]
    fn empty_chain_with_runtime_state_is_an_issue() {
        let detail = verify_chain("PKT-001", &[], &Head::default(), Some(&json!({"status": "done"})));
        assert!(!detail.ok());
        assert!(detail.issues[0].contains("missing DCL commits"));
    }

    #[test]
    fn empty_chain_without_runtime_state_is_clean() {
        let detail = verify_chain("PKT-001", &[], &Head::default(), None);
        assert!(detail.ok());
        assert_eq!(detail.commit_count, 0);
    }
}
