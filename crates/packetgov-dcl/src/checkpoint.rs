//! Project checkpoints: attested roots over all packet HEADs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use packetgov_utils::{CanonError, atomic_write_json_locked, sha256_hex};

use crate::ledger::{DclError, Ledger};

/// A signed-by-hash document over a snapshot of packet heads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub phase: String,
    pub packet_heads: BTreeMap<String, String>,
    pub merkle_root: String,
    pub created_at: String,
    pub checkpoint_hash: String,
}

impl Checkpoint {
    /// Recompute this checkpoint's hash from its stored fields.
    pub fn recompute_hash(&self) -> Result<String, CanonError> {
        let mut value = serde_json::to_value(self)
            .map_err(CanonError::ToValue)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("checkpoint_hash");
        }
        sha256_hex(&value)
    }
}

/// Write the next project checkpoint.
///
/// `merkle_root` is the canonical hash of the packet-head mapping; the
/// checkpoint hash covers the whole payload. Checkpoints are append-only.
pub fn write_project_checkpoint(
    ledger: &Ledger,
    phase: &str,
    packet_heads: BTreeMap<String, String>,
) -> Result<Checkpoint, DclError> {
    let root = packetgov_utils::paths::dcl_root(ledger.root()).join("project-checkpoints");
    packetgov_utils::paths::ensure_dir_all(&root).map_err(|e| DclError::Io {
        message: e.to_string(),
    })?;

    let existing = fs::read_dir(root.as_std_path())
        .map_err(|e| DclError::Io {
            message: e.to_string(),
        })?
        .filter(|entry| {
            entry
                .as_ref()
                .map(|e| e.file_name().to_string_lossy().ends_with(".json"))
                .unwrap_or(false)
        })
        .count();
    let seq = existing + 1;

    let merkle_root = sha256_hex(&packet_heads)?;
    let mut checkpoint = Checkpoint {
        checkpoint_id: format!("CHK-{seq:06}"),
        phase: phase.to_string(),
        packet_heads,
        merkle_root,
        created_at: packetgov_utils::now_utc(),
        checkpoint_hash: String::new(),
    };
    checkpoint.checkpoint_hash = checkpoint.recompute_hash()?;

    let path = root.join(format!("{seq:06}.json"));
    atomic_write_json_locked(&path, &checkpoint).map_err(|e| DclError::Io {
        message: e.to_string(),
    })?;

    Ok(checkpoint)
}

/// Snapshot of every packet HEAD, keyed by packet id.
pub fn collect_packet_heads(ledger: &Ledger) -> Result<BTreeMap<String, String>, DclError> {
    let mut heads = BTreeMap::new();
    for packet_id in ledger.packet_ids()? {
        let head = ledger.load_head(&packet_id)?;
        if head.seq > 0 {
            heads.insert(packet_id, head.commit_hash);
        }
    }
    Ok(heads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::ledger::CommitRequest;

    fn ledger_in(dir: &TempDir) -> Ledger {
        Ledger::new(&Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
    }

    #[test]
    fn merkle_root_is_canonical_hash_of_heads() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        let mut heads = BTreeMap::new();
        heads.insert("P1".to_string(), "a".repeat(64));
        heads.insert("P2".to_string(), "b".repeat(64));

        let checkpoint =
            write_project_checkpoint(&ledger, "M1", heads.clone()).unwrap();
        assert_eq!(checkpoint.checkpoint_id, "CHK-000001");
        assert_eq!(checkpoint.merkle_root, sha256_hex(&heads).unwrap());
        assert_eq!(
            checkpoint.checkpoint_hash,
            checkpoint.recompute_hash().unwrap()
        );
    }

    #[test]
    fn checkpoints_are_append_only_numbered() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        let first = write_project_checkpoint(&ledger, "M1", BTreeMap::new()).unwrap();
        let second = write_project_checkpoint(&ledger, "M2", BTreeMap::new()).unwrap();
        assert_eq!(first.checkpoint_id, "CHK-000001");
        assert_eq!(second.checkpoint_id, "CHK-000002");

        let root = packetgov_utils::paths::dcl_root(ledger.root()).join("project-checkpoints");
        assert!(root.join("000001.json").exists());
        assert!(root.join("000002.json").exists());
    }

    #[test]
    fn collect_heads_skips_empty_chains() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        ledger
            .write_commit(CommitRequest {
                packet_id: "P1",
                action: "claim",
                actor: "alice",
                reason: "",
                inputs: json!({}),
                pre_state: json!({"status": "pending"}),
                post_state: json!({"status": "in_progress"}),
            })
            .unwrap();

        let heads = collect_packet_heads(&ledger).unwrap();
        assert_eq!(heads.len(), 1);
        assert!(heads.contains_key("P1"));
    }

    #[test]
    fn tampered_checkpoint_fails_recompute() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        let mut checkpoint =
            write_project_checkpoint(&ledger, "M1", BTreeMap::new()).unwrap();
        checkpoint.phase = "M2".to_string();
        assert_ne!(
            checkpoint.checkpoint_hash,
            checkpoint.recompute_hash().unwrap()
        );
    }
}
