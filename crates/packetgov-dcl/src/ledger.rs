//! Per-packet ledger storage: the write protocol, journal recovery, and
//! on-disk verification.
//!
//! Layout under `<root>/.governance/dcl/`:
//!
//! ```text
//! packets/<packet_id>/HEAD
//! packets/<packet_id>/commits/NNNNNN.json
//! packets/<packet_id>/journal.json          (transient)
//! project-checkpoints/NNNNNN.json
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use thiserror::Error;
use tracing::warn;

use packetgov_utils::{
    CanonError, FileLock, LockError, LockOptions, atomic_write::read_json_opt,
    atomic_write_json_locked, paths, sha256_hex, sha256_hex_bytes,
};

use crate::commit::{
    ActionEnvelope, DclCommit, GENESIS, Head, Journal, VerifyDetail, build_diff, verify_chain,
};

/// Errors from ledger operations.
#[derive(Error, Debug)]
pub enum DclError {
    #[error("ledger lock failure: {0}")]
    Lock(#[from] LockError),

    #[error("canonicalization failure: {0}")]
    Canon(#[from] CanonError),

    #[error("ledger IO failure: {message}")]
    Io { message: String },
}

impl DclError {
    fn io(err: impl std::fmt::Display) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Inputs for one ledger commit.
#[derive(Debug)]
pub struct CommitRequest<'a> {
    pub packet_id: &'a str,
    pub action: &'a str,
    pub actor: &'a str,
    pub reason: &'a str,
    pub inputs: Value,
    pub pre_state: Value,
    pub post_state: Value,
}

/// Outcome of recovering one packet's journal.
#[derive(Debug, Clone, Serialize)]
pub struct JournalRecovery {
    pub packet_id: String,
    pub recovered: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
}

/// The per-repository commit ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    root: Utf8PathBuf,
    lock_options: LockOptions,
}

impl Ledger {
    /// Ledger for the governance root at `root`.
    #[must_use]
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            root: root.to_owned(),
            lock_options: LockOptions::default(),
        }
    }

    #[must_use]
    pub fn with_lock_options(mut self, options: LockOptions) -> Self {
        self.lock_options = options;
        self
    }

    fn dcl_root(&self) -> Utf8PathBuf {
        paths::dcl_root(&self.root)
    }

    fn packet_root(&self, packet_id: &str) -> Utf8PathBuf {
        self.dcl_root().join("packets").join(packet_id)
    }

    fn commits_root(&self, packet_id: &str) -> Utf8PathBuf {
        self.packet_root(packet_id).join("commits")
    }

    fn head_path(&self, packet_id: &str) -> Utf8PathBuf {
        self.packet_root(packet_id).join("HEAD")
    }

    fn journal_path(&self, packet_id: &str) -> Utf8PathBuf {
        self.packet_root(packet_id).join("journal.json")
    }

    /// Current HEAD for a packet; genesis when the chain is empty.
    pub fn load_head(&self, packet_id: &str) -> Result<Head, DclError> {
        Ok(read_json_opt(&self.head_path(packet_id))
            .map_err(DclError::io)?
            .unwrap_or_default())
    }

    fn save_head(&self, packet_id: &str, head: &Head) -> Result<(), DclError> {
        atomic_write_json_locked(&self.head_path(packet_id), head).map_err(DclError::io)
    }

    /// SHA-256 of the constitution document; empty string when absent.
    #[must_use]
    pub fn constitution_hash(&self) -> String {
        let path = paths::constitution_path(&self.root);
        match fs::read(path.as_std_path()) {
            Ok(bytes) => sha256_hex_bytes(&bytes),
            Err(_) => String::new(),
        }
    }

    /// Append one commit to a packet's chain.
    ///
    /// Two-phase journal protocol: prepare marker, commit file, HEAD, done
    /// marker, delete. Every file lands through an atomic rename, so a
    /// crash at any step is repairable by [`Ledger::recover_packet_journal`].
    pub fn write_commit(&self, req: CommitRequest<'_>) -> Result<DclCommit, DclError> {
        let head_path = self.head_path(req.packet_id);
        let _lock = FileLock::acquire(&head_path, self.lock_options)?;

        let head = self.load_head(req.packet_id)?;
        let seq = head.seq + 1;
        let prev_commit_hash = if seq > 1 {
            head.commit_hash.clone()
        } else {
            GENESIS.to_string()
        };

        let action_envelope =
            ActionEnvelope::transition(req.action, req.actor, req.inputs, req.reason);
        let action_hash = sha256_hex(&action_envelope)?;
        let pre_state_hash = sha256_hex(&req.pre_state)?;
        let post_state_hash = sha256_hex(&req.post_state)?;
        let diff = build_diff(&req.pre_state, &req.post_state);

        let mut commit = DclCommit {
            commit_id: format!("CMT-{}-{seq:06}", req.packet_id),
            packet_id: req.packet_id.to_string(),
            seq,
            prev_commit_hash,
            action_hash,
            pre_state_hash,
            post_state_hash,
            constitution_hash: self.constitution_hash(),
            diff,
            created_at: packetgov_utils::now_utc(),
            action_envelope,
            commit_hash: String::new(),
        };
        commit.commit_hash = commit.recompute_hash()?;

        let journal_path = self.journal_path(req.packet_id);
        atomic_write_json_locked(
            &journal_path,
            &Journal {
                stage: "prepare".to_string(),
                seq,
                commit_hash: commit.commit_hash.clone(),
            },
        )
        .map_err(DclError::io)?;

        let commit_path = self.commits_root(req.packet_id).join(format!("{seq:06}.json"));
        atomic_write_json_locked(&commit_path, &commit).map_err(DclError::io)?;

        self.save_head(
            req.packet_id,
            &Head {
                seq,
                commit_hash: commit.commit_hash.clone(),
            },
        )?;

        atomic_write_json_locked(
            &journal_path,
            &Journal {
                stage: "done".to_string(),
                seq,
                commit_hash: commit.commit_hash.clone(),
            },
        )
        .map_err(DclError::io)?;
        fs::remove_file(journal_path.as_std_path()).map_err(DclError::io)?;

        Ok(commit)
    }

    /// All commits for a packet, in sequence order.
    pub fn list_commits(&self, packet_id: &str) -> Result<Vec<DclCommit>, DclError> {
        let root = self.commits_root(packet_id);
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = fs::read_dir(root.as_std_path())
            .map_err(DclError::io)?
            .filter_map(|entry| {
                let name = entry.ok()?.file_name().to_string_lossy().into_owned();
                name.ends_with(".json").then_some(name)
            })
            .collect();
        names.sort();

        let mut commits = Vec::with_capacity(names.len());
        for name in names {
            let path = root.join(&name);
            let commit: DclCommit = read_json_opt(&path)
                .map_err(DclError::io)?
                .ok_or_else(|| DclError::io(format!("commit file vanished: {path}")))?;
            commits.push(commit);
        }
        Ok(commits)
    }

    /// All packet ids with a ledger directory, sorted.
    pub fn packet_ids(&self) -> Result<Vec<String>, DclError> {
        let packets_dir = self.dcl_root().join("packets");
        if !packets_dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<String> = fs::read_dir(packets_dir.as_std_path())
            .map_err(DclError::io)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                entry
                    .file_type()
                    .ok()?
                    .is_dir()
                    .then(|| entry.file_name().to_string_lossy().into_owned())
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Verify one packet's chain from disk.
    pub fn verify_packet_detailed(
        &self,
        packet_id: &str,
        state_packet: Option<&Value>,
    ) -> Result<VerifyDetail, DclError> {
        let commits = self.list_commits(packet_id)?;
        let head = self.load_head(packet_id)?;
        Ok(verify_chain(packet_id, &commits, &head, state_packet))
    }

    /// Verify every packet chain.
    ///
    /// `state_packets` supplies runtime snapshots for the coherence check;
    /// pass an empty map for structural (fast) verification.
    pub fn verify_all_detailed(
        &self,
        state_packets: &BTreeMap<String, Value>,
    ) -> Result<(bool, BTreeMap<String, VerifyDetail>), DclError> {
        let mut details = BTreeMap::new();
        for packet_id in self.packet_ids()? {
            let snapshot = state_packets.get(&packet_id);
            let detail = self.verify_packet_detailed(&packet_id, snapshot)?;
            details.insert(packet_id, detail);
        }
        let ok = details.values().all(VerifyDetail::ok);
        Ok((ok, details))
    }

    /// Repair one packet's journal after a crash.
    ///
    /// A durable commit file matching the journal advances HEAD and clears
    /// the journal; anything else leaves the packet `blocked` for operator
    /// attention.
    pub fn recover_packet_journal(&self, packet_id: &str) -> Result<JournalRecovery, DclError> {
        let journal_path = self.journal_path(packet_id);
        let Some(journal) = read_json_opt::<Journal>(&journal_path).map_err(DclError::io)? else {
            return Ok(JournalRecovery {
                packet_id: packet_id.to_string(),
                recovered: false,
                status: "none".to_string(),
                seq: None,
                commit_hash: None,
                issue: None,
            });
        };

        let commit_path = self
            .commits_root(packet_id)
            .join(format!("{:06}.json", journal.seq));
        let durable_commit: Option<DclCommit> = if journal.seq > 0 && !journal.commit_hash.is_empty()
        {
            read_json_opt(&commit_path).map_err(DclError::io)?
        } else {
            None
        };

        match durable_commit {
            Some(commit) if commit.commit_hash == journal.commit_hash => {
                // The commit is durable; HEAD may lag. The commit wins.
                self.save_head(
                    packet_id,
                    &Head {
                        seq: journal.seq,
                        commit_hash: journal.commit_hash.clone(),
                    },
                )?;
                fs::remove_file(journal_path.as_std_path()).map_err(DclError::io)?;
                Ok(JournalRecovery {
                    packet_id: packet_id.to_string(),
                    recovered: true,
                    status: "recovered".to_string(),
                    seq: Some(journal.seq),
                    commit_hash: Some(journal.commit_hash),
                    issue: None,
                })
            }
            _ => {
                warn!(packet_id, seq = journal.seq, "journal present but commit payload incomplete");
                Ok(JournalRecovery {
                    packet_id: packet_id.to_string(),
                    recovered: false,
                    status: "blocked".to_string(),
                    seq: Some(journal.seq),
                    commit_hash: Some(journal.commit_hash),
                    issue: Some("journal present but commit payload incomplete".to_string()),
                })
            }
        }
    }

    /// Repair every packet journal found on disk.
    pub fn recover_all_journals(&self) -> Result<Vec<JournalRecovery>, DclError> {
        let mut reports = Vec::new();
        for packet_id in self.packet_ids()? {
            let report = self.recover_packet_journal(&packet_id)?;
            if report.status != "none" {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Full commit history for a packet.
    pub fn history(&self, packet_id: &str) -> Result<Vec<DclCommit>, DclError> {
        self.list_commits(packet_id)
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        &self.root
    }
}
