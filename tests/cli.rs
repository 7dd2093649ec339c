//! CLI surface tests: exit codes, JSON output stability, and hint lines.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use support::Project;

fn packetgov(project: &Project) -> Command {
    let mut cmd = Command::cargo_bin("packetgov").unwrap();
    cmd.arg("--root").arg(project.root.as_str());
    cmd.env_remove("PACKETGOV_ROOT");
    cmd
}

#[test]
fn ready_lists_claimable_packets() {
    let project = Project::linear();
    packetgov(&project)
        .args(["ready"])
        .assert()
        .success()
        .stdout(predicate::str::contains("A"));
}

#[test]
fn claim_then_done_happy_path() {
    let project = Project::linear();

    packetgov(&project)
        .args(["claim", "A", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("A claimed by alice"));

    packetgov(&project)
        .args(["done", "A", "alice", "--notes", "implemented"])
        .assert()
        .success()
        .stdout(predicate::str::contains("A marked done"));
}

#[test]
fn json_flag_emits_machine_readable_output() {
    let project = Project::linear();

    let output = packetgov(&project)
        .args(["--json", "claim", "A", "alice"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["ok"], true);
    assert_eq!(value["message"], "A claimed by alice");

    let output = packetgov(&project)
        .args(["--json", "status"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let state: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(state["packets"]["A"]["status"], "in_progress");
    assert_eq!(state["schema_version"], "1.1");
}

#[test]
fn blocked_claim_exits_with_blocked_code_and_hint() {
    let project = Project::linear();

    packetgov(&project)
        .args(["claim", "B", "bob"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("[BLOCKED_BY_DEPS] Blocked by A"))
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn unknown_packet_exits_not_found() {
    let project = Project::linear();
    packetgov(&project)
        .args(["claim", "NOPE", "alice"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("[NOT_FOUND] Packet NOPE not found"));
}

#[test]
fn policy_denial_exits_policy_denied() {
    let project = Project::linear();
    packetgov(&project).args(["claim", "A", "alice"]).assert().success();

    packetgov(&project)
        .args(["done", "A", "alice", "--notes", ""])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("[POLICY_DENIED]"));
}

#[test]
fn precondition_failure_exits_with_code_4() {
    let project = Project::linear();
    packetgov(&project).args(["claim", "A", "alice"]).assert().success();

    packetgov(&project)
        .args(["claim", "A", "bob"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains(
            "[PRECONDITION_FAILED] Packet A is in_progress, not pending",
        ));
}

#[test]
fn json_errors_are_structured() {
    let project = Project::linear();
    let output = packetgov(&project)
        .args(["--json", "claim", "B", "bob"])
        .assert()
        .code(5)
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["ok"], false);
    assert_eq!(value["kind"], "blocked_by_deps");
    assert_eq!(value["code"], 5);
    assert!(value["hint"].is_string());
}

#[test]
fn verify_reports_clean_project() {
    let project = Project::linear();
    packetgov(&project).args(["claim", "A", "alice"]).assert().success();

    packetgov(&project)
        .args(["verify", "--mode", "full"])
        .assert()
        .success()
        .stdout(predicate::str::contains("integrity: ok"));
}

#[test]
fn verify_fails_on_tampered_ledger() {
    let project = Project::linear();
    packetgov(&project).args(["claim", "A", "alice"]).assert().success();

    let commit_path = packetgov_utils::paths::dcl_root(&project.root)
        .join("packets/A/commits/000001.json");
    let mut raw = std::fs::read_to_string(commit_path.as_std_path()).unwrap();
    raw = raw.replace("\"claim\"", "\"forged\"");
    std::fs::write(commit_path.as_std_path(), raw).unwrap();

    packetgov(&project)
        .args(["verify"])
        .assert()
        .code(7)
        .stdout(predicate::str::contains("integrity: FAILED"));
}

#[test]
fn export_and_verify_bundle_via_cli() {
    let project = Project::linear();
    packetgov(&project).args(["claim", "A", "alice"]).assert().success();
    packetgov(&project)
        .args(["done", "A", "alice", "--notes", "done"])
        .assert()
        .success();

    let out = project.dir.path().join("proof.tar.gz");
    packetgov(&project)
        .args(["export-bundle", "A", "--out", out.to_str().unwrap()])
        .assert()
        .success();

    packetgov(&project)
        .args(["verify-bundle", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("bundle: ok"));
}

#[test]
fn history_shows_commit_sequence() {
    let project = Project::linear();
    packetgov(&project).args(["claim", "A", "alice"]).assert().success();
    packetgov(&project)
        .args(["done", "A", "alice", "--notes", "done"])
        .assert()
        .success();

    let output = packetgov(&project)
        .args(["--json", "history", "A"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let commits: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let commits = commits.as_array().unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0]["seq"], 1);
    assert_eq!(commits[0]["prev_commit_hash"], "GENESIS");
    assert_eq!(commits[1]["seq"], 2);
}

#[test]
fn checkpoint_via_cli() {
    let project = Project::linear();
    packetgov(&project).args(["claim", "A", "alice"]).assert().success();

    let output = packetgov(&project)
        .args(["--json", "checkpoint", "--phase", "M1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let checkpoint: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(checkpoint["checkpoint_id"], "CHK-000001");
    assert_eq!(checkpoint["phase"], "M1");
    assert!(checkpoint["packet_heads"]["A"].is_string());
}

#[test]
fn missing_subcommand_is_a_cli_error() {
    let project = Project::linear();
    packetgov(&project).assert().code(2);
}

#[test]
fn briefing_renders_counts() {
    let project = Project::linear();
    packetgov(&project).args(["claim", "A", "alice"]).assert().success();

    let output = packetgov(&project)
        .args(["--json", "briefing"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let briefing: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(briefing["schema_id"], "wbs.briefing");
    assert_eq!(briefing["counts"]["in_progress"], 1);
    assert_eq!(briefing["counts"]["pending"], 1);
}

#[test]
fn context_bundle_is_always_json() {
    let project = Project::linear();
    packetgov(&project).args(["claim", "A", "alice"]).assert().success();

    let output = packetgov(&project)
        .args(["context", "A"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let bundle: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(bundle["schema_id"], "wbs.context_bundle");
    assert_eq!(bundle["runtime_state"]["status"], "in_progress");
}
