//! CLI dispatch: translate parsed arguments into engine calls and render
//! the results. The adapter never mutates state directly.

use camino::Utf8PathBuf;
use clap::Parser;
use crossterm::style::{Color, Stylize};
use serde_json::json;
use std::io::IsTerminal;

use packetgov_dcl::{collect_packet_heads, verify_proof_bundle, write_project_checkpoint};
use packetgov_engine::{BundleLimits, Engine, EngineError, IntegrityMode, TransitionOutcome};
use packetgov_state::PacketStatus;

use crate::cli::args::{Cli, Commands};
use crate::exit_codes::{codes, error_to_exit_code};
use crate::hints::hint_for;
use crate::server::{self, ServerConfig};

/// Process exit status carried back to `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

/// Check if colored output should be used: stdout is a TTY and NO_COLOR is
/// not set.
fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn status_color(status: PacketStatus) -> Color {
    match status {
        PacketStatus::Pending => Color::Yellow,
        PacketStatus::InProgress => Color::Cyan,
        PacketStatus::Done => Color::Green,
        PacketStatus::Failed => Color::Red,
        PacketStatus::Blocked => Color::Magenta,
    }
}

fn styled_status(status: PacketStatus) -> String {
    let text = status.to_string();
    if use_color() {
        format!("{}", text.with(status_color(status)))
    } else {
        text
    }
}

/// Resolve the governance root: flag, then env, then current directory.
fn resolve_root(flag: Option<&str>) -> Utf8PathBuf {
    if let Some(root) = flag {
        return Utf8PathBuf::from(root);
    }
    if let Ok(root) = std::env::var("PACKETGOV_ROOT") {
        return Utf8PathBuf::from(root);
    }
    Utf8PathBuf::from(".")
}

fn emit_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}

fn print_outcome(outcome: &TransitionOutcome, json: bool) {
    if json {
        emit_json(&json!({
            "ok": true,
            "message": outcome.message,
            "warnings": outcome.warnings,
            "blocked": outcome.blocked,
        }));
        return;
    }
    println!("{}", outcome.message);
    for warning in &outcome.warnings {
        println!("  warning: {warning}");
    }
}

fn report_error(error: &EngineError, json: bool) -> ExitCode {
    let (code, label) = error_to_exit_code(error);
    let message = error.to_string();
    let hint = hint_for(&message);
    if json {
        emit_json(&json!({
            "ok": false,
            "kind": error.kind(),
            "code": code,
            "message": message,
            "hint": hint,
        }));
    } else {
        eprintln!("[{label}] {message}");
        if let Some(hint) = hint {
            eprintln!("hint: {hint}");
        }
    }
    ExitCode(code)
}

/// Entry point invoked by `main`. Handles all output including errors.
pub fn run() -> Result<(), ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap renders its own help/usage text; version and help exits
            // are successes.
            let is_error = e.use_stderr();
            let _ = e.print();
            return if is_error {
                Err(ExitCode(codes::CLI_ARGS))
            } else {
                Ok(())
            };
        }
    };

    let _ = packetgov_utils::logging::init_tracing(cli.verbose);
    let root = resolve_root(cli.root.as_deref());
    let json = cli.json;

    match dispatch(&root, json, cli.command) {
        Ok(code) if code.as_i32() == codes::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(error) => Err(report_error(&error, json)),
    }
}

#[allow(clippy::too_many_lines)]
fn dispatch(root: &Utf8PathBuf, json: bool, command: Commands) -> Result<ExitCode, EngineError> {
    match command {
        Commands::Claim { packet_id, agent } => {
            let outcome = Engine::open(root)?.claim(&packet_id, &agent)?;
            print_outcome(&outcome, json);
        }
        Commands::Done {
            packet_id,
            agent,
            notes,
        } => {
            let outcome = Engine::open(root)?.done(&packet_id, &agent, &notes)?;
            print_outcome(&outcome, json);
        }
        Commands::Note {
            packet_id,
            agent,
            notes,
        } => {
            let outcome = Engine::open(root)?.note(&packet_id, &agent, &notes)?;
            print_outcome(&outcome, json);
        }
        Commands::Fail {
            packet_id,
            agent,
            reason,
        } => {
            let outcome = Engine::open(root)?.fail(&packet_id, &agent, &reason)?;
            print_outcome(&outcome, json);
        }
        Commands::Reset { packet_id } => {
            let outcome = Engine::open(root)?.reset(&packet_id)?;
            print_outcome(&outcome, json);
        }
        Commands::Handover {
            packet_id,
            agent,
            reason,
            progress,
            files,
            remaining,
            to_agent,
        } => {
            let outcome = Engine::open(root)?.handover(
                &packet_id,
                &agent,
                &reason,
                &progress,
                &files,
                &remaining,
                to_agent.as_deref(),
            )?;
            print_outcome(&outcome, json);
        }
        Commands::Resume { packet_id, agent } => {
            let outcome = Engine::open(root)?.resume(&packet_id, &agent)?;
            print_outcome(&outcome, json);
        }
        Commands::CloseoutL2 {
            area_id,
            agent,
            assessment,
            notes,
        } => {
            let outcome = Engine::open(root)?.closeout_l2(&area_id, &agent, &assessment, &notes)?;
            print_outcome(&outcome, json);
        }
        Commands::Ready => {
            let ready = Engine::open(root)?.ready()?;
            if json {
                emit_json(&json!({"ready": ready}));
            } else if ready.is_empty() {
                println!("no packets ready");
            } else {
                for packet in &ready {
                    println!(
                        "{}  {}",
                        packet.id,
                        packet.title.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Commands::Status => {
            let state = Engine::open(root)?.load_state()?;
            if json {
                emit_json(&state);
            } else {
                for (id, packet) in &state.packets {
                    println!(
                        "{id}  {}  {}",
                        styled_status(packet.status),
                        packet.assigned_to.as_deref().unwrap_or("-")
                    );
                }
                if !state.area_closeouts.is_empty() {
                    println!();
                    for (area_id, closeout) in &state.area_closeouts {
                        println!("area {area_id}: {} by {}", closeout.status, closeout.closed_by);
                    }
                }
            }
        }
        Commands::Context {
            packet_id,
            compact,
            max_events,
            max_notes_bytes,
            max_handovers,
        } => {
            let bundle = Engine::open(root)?.context_bundle(
                &packet_id,
                BundleLimits {
                    compact,
                    max_events,
                    max_notes_bytes,
                    max_handovers,
                },
            )?;
            // The bundle is a machine contract; both modes emit JSON.
            emit_json(&bundle);
        }
        Commands::Briefing { recent, compact } => {
            let briefing = Engine::open(root)?.briefing(recent, compact)?;
            if json {
                emit_json(&briefing);
            } else {
                println!("project: {}", briefing.project["project_name"].as_str().unwrap_or("-"));
                for (status, count) in &briefing.counts {
                    println!("  {status}: {count}");
                }
                println!("ready: {}", briefing.ready_packets.len());
                println!("blocked: {}", briefing.blocked_packets.len());
                for event in &briefing.recent_events {
                    println!(
                        "  {} {} {}",
                        event.timestamp,
                        event.packet_id,
                        event.event
                    );
                }
            }
        }
        Commands::Verify { mode } => {
            let mode = match mode.as_str() {
                "full" => IntegrityMode::Full,
                _ => IntegrityMode::Fast,
            };
            let report = Engine::open(root)?.verify_integrity(mode)?;
            if json {
                emit_json(&report);
            } else {
                println!(
                    "integrity: {} ({} packets, {} commits verified)",
                    if report.ok { "ok" } else { "FAILED" },
                    report.packets_checked,
                    report.commits_verified
                );
                for issue in &report.integrity_errors {
                    println!("  issue: {issue}");
                }
            }
            if !report.ok {
                return Ok(ExitCode(codes::STATE_INTEGRITY));
            }
        }
        Commands::VerifyLog => {
            let (ok, issues) = Engine::open(root)?.verify_log()?;
            if json {
                emit_json(&json!({"ok": ok, "issues": issues}));
            } else {
                println!("log chain: {}", if ok { "ok" } else { "FAILED" });
                for issue in &issues {
                    println!("  issue: {issue}");
                }
            }
            if !ok {
                return Ok(ExitCode(codes::STATE_INTEGRITY));
            }
        }
        Commands::History { packet_id } => {
            let commits = Engine::open(root)?.ledger().history(&packet_id)?;
            if json {
                emit_json(&commits);
            } else {
                for commit in &commits {
                    println!(
                        "{:>6}  {:<10}  {:<12}  {}",
                        commit.seq,
                        commit.action_envelope.name,
                        commit.action_envelope.actor.id,
                        commit.created_at
                    );
                }
            }
        }
        Commands::Checkpoint { phase } => {
            let engine = Engine::open(root)?;
            let heads = collect_packet_heads(engine.ledger())?;
            let checkpoint = write_project_checkpoint(engine.ledger(), &phase, heads)?;
            if json {
                emit_json(&checkpoint);
            } else {
                println!(
                    "{} ({} heads, merkle {})",
                    checkpoint.checkpoint_id,
                    checkpoint.packet_heads.len(),
                    &checkpoint.merkle_root[..12]
                );
            }
        }
        Commands::ExportBundle { packet_id, out } => {
            let engine = Engine::open(root)?;
            let out_path = Utf8PathBuf::from(&out);
            packetgov_dcl::export_proof_bundle(engine.ledger(), &packet_id, &out_path)?;
            if json {
                emit_json(&json!({"ok": true, "packet_id": packet_id, "out": out}));
            } else {
                println!("proof bundle written: {out}");
            }
        }
        Commands::VerifyBundle { bundle } => {
            let (ok, issues) = verify_proof_bundle(&Utf8PathBuf::from(&bundle))?;
            if json {
                emit_json(&json!({"ok": ok, "issues": issues}));
            } else {
                println!("bundle: {}", if ok { "ok" } else { "FAILED" });
                for issue in &issues {
                    println!("  issue: {issue}");
                }
            }
            if !ok {
                return Ok(ExitCode(codes::STATE_INTEGRITY));
            }
        }
        Commands::Serve { host, port, strict } => {
            let config = ServerConfig {
                root: root.clone(),
                host,
                port,
                strict,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(EngineError::io)?;
            runtime
                .block_on(server::serve(config))
                .map_err(EngineError::io)?;
        }
    }
    Ok(ExitCode(codes::SUCCESS))
}
