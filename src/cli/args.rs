//! CLI argument definitions and parsing structures.

use clap::{Parser, Subcommand};

/// packetgov - governed work-packet orchestration kernel
#[derive(Parser)]
#[command(name = "packetgov")]
#[command(about = "Governed work-packet orchestration with a tamper-evident commit ledger")]
#[command(long_about = r#"
packetgov mediates every lifecycle transition of work packets against a
shared work-breakdown structure. Every state change is authorized by a
deterministic policy, persisted atomically, and recorded in a hash-chained
ledger that can be independently re-verified.

EXAMPLES:
  # See what is claimable right now
  packetgov ready

  # Claim and complete a packet
  packetgov claim PKT-001 alice
  packetgov done PKT-001 alice --notes "implemented and tested"

  # Hand a packet to a teammate
  packetgov handover PKT-002 alice --reason "out of office" --to bob
  packetgov resume PKT-002 bob

  # Audit the ledger
  packetgov verify --mode full
  packetgov export-bundle PKT-001 --out proof.tar.gz

  # Serve the HTTP API
  packetgov serve --port 8081

LAYOUT:
  The governance root (default: current directory, override with --root or
  PACKETGOV_ROOT) holds .governance/wbs.json, .governance/wbs-state.json,
  the per-packet ledger under .governance/dcl/, and constitution.md.
"#)]
#[command(version)]
pub struct Cli {
    /// Governance root directory (default: PACKETGOV_ROOT or ".")
    #[arg(long, global = true)]
    pub root: Option<String>,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Claim a pending packet whose dependencies are all done
    Claim {
        /// Packet id
        packet_id: String,
        /// Acting agent id
        agent: String,
    },

    /// Mark an in-progress packet done
    Done {
        packet_id: String,
        agent: String,
        /// Completion notes (required by the default policy)
        #[arg(long)]
        notes: String,
    },

    /// Replace a packet's notes
    Note {
        packet_id: String,
        agent: String,
        #[arg(long)]
        notes: String,
    },

    /// Fail a packet and block its transitive dependents
    Fail {
        packet_id: String,
        agent: String,
        /// Failure reason
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Revert an in-progress packet to pending
    Reset { packet_id: String },

    /// Hand an in-progress packet over, releasing ownership
    Handover {
        packet_id: String,
        agent: String,
        /// Why the packet is being handed over
        #[arg(long)]
        reason: String,
        /// Progress notes for the next agent
        #[arg(long, default_value = "")]
        progress: String,
        /// Files touched so far (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
        /// Remaining work items (repeatable)
        #[arg(long = "remaining")]
        remaining: Vec<String>,
        /// Target agent; omit to leave the handover open
        #[arg(long = "to")]
        to_agent: Option<String>,
    },

    /// Resume an active handover, taking ownership
    Resume { packet_id: String, agent: String },

    /// Close a level-2 work area after drift assessment
    #[command(name = "closeout-l2")]
    CloseoutL2 {
        area_id: String,
        agent: String,
        /// Path to the drift assessment document
        #[arg(long)]
        assessment: String,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// List packets that are claimable right now
    Ready,

    /// Show the normalized runtime state
    Status,

    /// Assemble the context bundle for one packet
    Context {
        packet_id: String,
        #[arg(long)]
        compact: bool,
        #[arg(long, default_value_t = 40)]
        max_events: usize,
        #[arg(long, default_value_t = 4000)]
        max_notes_bytes: usize,
        #[arg(long, default_value_t = 40)]
        max_handovers: usize,
    },

    /// Session bootstrap summary: counts, ready/blocked, recent events
    Briefing {
        #[arg(long, default_value_t = 10)]
        recent: usize,
        #[arg(long)]
        compact: bool,
    },

    /// Verify ledger chains, journals, config lock, and the activity log
    Verify {
        /// fast: structural only; full: adds runtime coherence
        #[arg(long, default_value = "fast")]
        mode: String,
    },

    /// Verify the activity log hash chain
    #[command(name = "verify-log")]
    VerifyLog,

    /// Show a packet's full commit history
    History { packet_id: String },

    /// Write a project checkpoint over all packet HEADs
    Checkpoint {
        /// Phase label recorded in the checkpoint
        #[arg(long)]
        phase: String,
    },

    /// Export a self-verifying proof bundle for one packet
    #[command(name = "export-bundle")]
    ExportBundle {
        packet_id: String,
        /// Output archive path (.tar.gz)
        #[arg(long)]
        out: String,
    },

    /// Re-verify a proof bundle from the archive alone
    #[command(name = "verify-bundle")]
    VerifyBundle {
        /// Bundle archive path
        bundle: String,
    },

    /// Serve the JSON HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8081)]
        port: u16,
        /// Refuse to bind when startup integrity verification fails
        #[arg(long)]
        strict: bool,
    },
}
