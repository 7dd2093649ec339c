//! Proof bundles: portable archives of one packet's commit history.
//!
//! A bundle is a gzip-compressed tar with `commits/NNNNNN.json`, `HEAD`,
//! and `constitution.md`. Given the canonical JSON and hash rules it is
//! self-verifying: re-verification needs nothing but the archive.

use camino::Utf8Path;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Read;
use tar::{Archive, Builder, Header};

use packetgov_utils::sha256_hex_bytes;

use crate::commit::{DclCommit, Head, verify_chain};
use crate::ledger::{DclError, Ledger};

fn io_err(err: impl std::fmt::Display) -> DclError {
    DclError::Io {
        message: err.to_string(),
    }
}

fn append_bytes(
    builder: &mut Builder<GzEncoder<File>>,
    name: &str,
    bytes: &[u8],
) -> Result<(), DclError> {
    let mut header = Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, bytes).map_err(io_err)
}

/// Export one packet's proof bundle to `out_path`.
pub fn export_proof_bundle(
    ledger: &Ledger,
    packet_id: &str,
    out_path: &Utf8Path,
) -> Result<(), DclError> {
    if let Some(parent) = out_path.parent() {
        packetgov_utils::paths::ensure_dir_all(parent).map_err(io_err)?;
    }

    let file = File::create(out_path.as_std_path()).map_err(io_err)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    for commit in ledger.list_commits(packet_id)? {
        let name = format!("commits/{:06}.json", commit.seq);
        let mut bytes = serde_json::to_vec_pretty(&commit).map_err(io_err)?;
        bytes.push(b'\n');
        append_bytes(&mut builder, &name, &bytes)?;
    }

    let head = ledger.load_head(packet_id)?;
    if head.seq > 0 {
        let mut bytes = serde_json::to_vec_pretty(&head).map_err(io_err)?;
        bytes.push(b'\n');
        append_bytes(&mut builder, "HEAD", &bytes)?;
    }

    let constitution = packetgov_utils::paths::constitution_path(ledger.root());
    if let Ok(bytes) = std::fs::read(constitution.as_std_path()) {
        append_bytes(&mut builder, "constitution.md", &bytes)?;
    }

    let encoder = builder.into_inner().map_err(io_err)?;
    encoder.finish().map_err(io_err)?;
    Ok(())
}

/// Re-verify a proof bundle from the archive alone.
///
/// Returns the verification verdict plus the issues found. The packet id is
/// taken from the commits themselves; the expected constitution hash is
/// cross-checked against the bundled document when both are present.
pub fn verify_proof_bundle(bundle_path: &Utf8Path) -> Result<(bool, Vec<String>), DclError> {
    let file = File::open(bundle_path.as_std_path()).map_err(io_err)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut commits: Vec<(String, DclCommit)> = Vec::new();
    let mut head: Option<Head> = None;
    let mut constitution: Option<Vec<u8>> = None;

    for entry in archive.entries().map_err(io_err)? {
        let mut entry = entry.map_err(io_err)?;
        let name = entry
            .path()
            .map_err(io_err)?
            .to_string_lossy()
            .into_owned();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).map_err(io_err)?;

        if name.starts_with("commits/") && name.ends_with(".json") {
            let commit: DclCommit = serde_json::from_slice(&bytes)
                .map_err(|e| io_err(format!("unreadable commit {name}: {e}")))?;
            commits.push((name, commit));
        } else if name == "HEAD" {
            head = Some(
                serde_json::from_slice(&bytes)
                    .map_err(|e| io_err(format!("unreadable HEAD: {e}")))?,
            );
        } else if name == "constitution.md" {
            constitution = Some(bytes);
        }
    }

    commits.sort_by(|a, b| a.0.cmp(&b.0));
    let commits: Vec<DclCommit> = commits.into_iter().map(|(_, c)| c).collect();

    let mut issues = Vec::new();
    let Some(head) = head else {
        issues.push("bundle missing HEAD".to_string());
        return Ok((false, issues));
    };
    if commits.is_empty() {
        issues.push("bundle contains no commits".to_string());
        return Ok((false, issues));
    }

    let packet_id = commits[0].packet_id.clone();
    let detail = verify_chain(&packet_id, &commits, &head, None);
    issues.extend(detail.issues);

    if let Some(bytes) = constitution {
        let document_hash = sha256_hex_bytes(&bytes);
        for commit in &commits {
            if !commit.constitution_hash.is_empty() && commit.constitution_hash != document_hash {
                issues.push(format!(
                    "constitution_hash mismatch at {packet_id}#{}",
                    commit.seq
                ));
            }
        }
    }

    Ok((issues.is_empty(), issues))
}
