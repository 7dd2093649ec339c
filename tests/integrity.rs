//! Integrity service scenarios: config lock, log chain tamper, and the
//! fast/full mode split.

mod support;

use packetgov::IntegrityMode;
use packetgov_state::{LogMode, StateStore};
use packetgov_utils::paths;
use support::Project;

fn enable_hash_chain(project: &Project) {
    let store = StateStore::new(paths::state_path(&project.root));
    let mut state = store.load().unwrap();
    state.log_integrity_mode = LogMode::HashChain;
    store.save(&mut state).unwrap();
}

#[test]
fn pristine_project_passes_full_verification() {
    let project = Project::linear();
    let engine = project.engine();
    let report = engine.verify_integrity(IntegrityMode::Full).unwrap();
    assert!(report.ok);
    assert_eq!(report.packets_checked, 0);
    assert_eq!(report.commits_verified, 0);
    assert_eq!(report.packet_count, 2);
}

#[test]
fn config_lock_mismatch_is_fatal() {
    let project = Project::linear();
    let engine = project.engine();
    engine.claim("A", "alice").unwrap();

    std::fs::write(
        paths::dcl_config_path(&project.root).as_std_path(),
        serde_json::to_string_pretty(&serde_json::json!({
            "mode": "dcl",
            "hash_algorithm": "sha256",
            "canonicalization_version": "2.0",
            "dcl_version": "1.0",
        }))
        .unwrap(),
    )
    .unwrap();

    let report = engine.verify_integrity(IntegrityMode::Fast).unwrap();
    assert!(!report.ok);
    assert!(!report.config_lock.ok);
    assert!(
        report.config_lock.issues[0].contains("canonicalization_version mismatch")
    );
}

#[test]
fn matching_config_lock_passes() {
    let project = Project::linear();
    let engine = project.engine();
    engine.claim("A", "alice").unwrap();

    std::fs::write(
        paths::dcl_config_path(&project.root).as_std_path(),
        serde_json::to_string_pretty(&serde_json::json!({
            "mode": "dcl",
            "hash_algorithm": "sha256",
            "canonicalization_version": "1.0",
            "dcl_version": "1.0",
            "state_schema_version": "1.1",
        }))
        .unwrap(),
    )
    .unwrap();

    let report = engine.verify_integrity(IntegrityMode::Full).unwrap();
    assert!(report.ok, "issues: {:?}", report.integrity_errors);
}

#[test]
fn hash_chained_log_tamper_is_detected() {
    let project = Project::linear();
    enable_hash_chain(&project);
    let engine = project.engine();

    engine.claim("A", "alice").unwrap();
    engine.done("A", "alice", "done").unwrap();

    let (ok, _) = engine.verify_log().unwrap();
    assert!(ok);

    // Mutate one byte of a hashed entry's notes.
    let store = StateStore::new(paths::state_path(&project.root));
    let mut state = store.load().unwrap();
    state.log[0].notes = Some("Claimed by mallory".to_string());
    store.save(&mut state).unwrap();

    let (ok, issues) = engine.verify_log().unwrap();
    assert!(!ok);
    assert!(issues.iter().any(|i| i.contains("hash mismatch")));

    // The integrity service folds log issues into its verdict.
    let report = engine.verify_integrity(IntegrityMode::Fast).unwrap();
    assert!(!report.ok);
}

#[test]
fn fast_mode_skips_runtime_coherence() {
    let project = Project::linear();
    let engine = project.engine();
    engine.claim("A", "alice").unwrap();

    // Diverge runtime state from the ledger.
    let store = StateStore::new(paths::state_path(&project.root));
    let mut state = store.load().unwrap();
    state.packets.get_mut("A").unwrap().notes = Some("edited behind the ledger".to_string());
    store.save(&mut state).unwrap();

    let fast = engine.verify_integrity(IntegrityMode::Fast).unwrap();
    assert!(fast.ok);
    assert_eq!(fast.mode, "fast");

    let full = engine.verify_integrity(IntegrityMode::Full).unwrap();
    assert!(!full.ok);
    assert_eq!(full.mode, "full");
    assert!(
        full.verification_issues["A"]
            .iter()
            .any(|i| i.contains("runtime state mismatch"))
    );
}

#[test]
fn report_counts_reflect_the_ledger() {
    let project = Project::cascade();
    let engine = project.engine();

    engine.claim("A", "alice").unwrap();
    engine.done("A", "alice", "done").unwrap();
    engine.claim("B", "bob").unwrap();

    let report = engine.verify_integrity(IntegrityMode::Full).unwrap();
    assert!(report.ok, "issues: {:?}", report.integrity_errors);
    assert_eq!(report.packet_count, 4);
    assert_eq!(report.packets_checked, 2);
    assert_eq!(report.commits_verified, 3);
}

#[test]
fn plain_mode_log_always_verifies() {
    let project = Project::linear();
    let engine = project.engine();
    engine.claim("A", "alice").unwrap();

    // Plain-mode entries carry no chain fields; editing them is invisible
    // to the verifier. That is the documented trade-off of plain mode.
    let store = StateStore::new(paths::state_path(&project.root));
    let mut state = store.load().unwrap();
    state.log[0].notes = Some("edited".to_string());
    store.save(&mut state).unwrap();

    let (ok, issues) = engine.verify_log().unwrap();
    assert!(ok, "issues: {issues:?}");
}
