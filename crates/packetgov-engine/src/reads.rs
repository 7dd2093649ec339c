//! Read operations: ready set, briefing, and context bundles.
//!
//! Reads load state without the write lock; they tolerate racing a writer
//! because state writes are atomic.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use packetgov_state::{ActivityEvent, Handover, PacketStatus};
use packetgov_utils::now_utc;

use crate::engine::Engine;
use crate::error::EngineError;

/// A packet currently claimable.
#[derive(Debug, Clone, Serialize)]
pub struct ReadyPacket {
    pub id: String,
    pub wbs_ref: Option<String>,
    pub title: Option<String>,
}

/// Versioned session bootstrap summary for operators and agents.
#[derive(Debug, Clone, Serialize)]
pub struct Briefing {
    pub schema_id: String,
    pub schema_version: String,
    pub generated_at: String,
    pub mode: String,
    pub truncated: bool,
    pub limits: BTreeMap<String, usize>,
    pub project: Value,
    pub counts: BTreeMap<String, usize>,
    pub ready_packets: Vec<ReadyPacket>,
    pub blocked_packets: Vec<Value>,
    pub active_assignments: Vec<Value>,
    pub recent_events: Vec<ActivityEvent>,
}

/// Truncation budgets for a context bundle.
#[derive(Debug, Clone, Copy)]
pub struct BundleLimits {
    pub compact: bool,
    pub max_events: usize,
    pub max_notes_bytes: usize,
    pub max_handovers: usize,
}

impl Default for BundleLimits {
    fn default() -> Self {
        Self {
            compact: false,
            max_events: 40,
            max_notes_bytes: 4000,
            max_handovers: 40,
        }
    }
}

/// Everything an agent needs to pick up one packet.
#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    pub schema_id: String,
    pub schema_version: String,
    pub generated_at: String,
    pub mode: String,
    pub truncated: bool,
    pub limits: BTreeMap<String, usize>,
    pub packet_id: String,
    pub packet_definition: Value,
    pub runtime_state: Value,
    pub dependencies: Value,
    pub history: Vec<ActivityEvent>,
    pub handovers: Vec<Handover>,
    pub file_manifest: Vec<Value>,
    pub truncation: Value,
}

// Path-like tokens worth listing in a file manifest.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_./-]+").unwrap());

const MANIFEST_EXTENSIONS: &[&str] = &[
    "md", "txt", "json", "rs", "py", "sh", "yml", "yaml", "toml", "html", "js", "ts", "tsx",
    "csv", "log",
];

/// Truncate UTF-8 text to a byte budget, returning the dropped byte count.
fn truncate_text(value: Option<&str>, max_bytes: usize) -> (Option<String>, usize) {
    let Some(text) = value else {
        return (None, 0);
    };
    if text.len() <= max_bytes {
        return (Some(text.to_string()), 0);
    }
    let mut cut = max_bytes;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    (Some(text[..cut].to_string()), text.len() - cut)
}

fn collect_text_values(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                collect_text_values(item, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_text_values(item, out);
            }
        }
        _ => {}
    }
}

impl Engine {
    /// Packets with status pending whose dependencies are all done.
    pub fn ready(&self) -> Result<Vec<ReadyPacket>, EngineError> {
        let state = self.load_state()?;
        let mut ready = Vec::new();
        for packet in &self.definition().packets {
            if state.packet_status(&packet.id) != PacketStatus::Pending {
                continue;
            }
            let deps_done = self
                .expanded_dependencies()
                .get(&packet.id)
                .map(|deps| {
                    deps.iter()
                        .all(|dep| state.packet_status(dep) == PacketStatus::Done)
                })
                .unwrap_or(true);
            if deps_done {
                ready.push(ReadyPacket {
                    id: packet.id.clone(),
                    wbs_ref: packet.wbs_ref.clone(),
                    title: packet.title.clone(),
                });
            }
        }
        Ok(ready)
    }

    /// Per-status counts, ready/blocked lists, active assignments, and the
    /// tail of the activity log.
    pub fn briefing(&self, recent_events: usize, compact: bool) -> Result<Briefing, EngineError> {
        let state = self.load_state()?;
        let metadata = &self.definition().metadata;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut active_assignments = Vec::new();
        for packet in &self.definition().packets {
            let runtime = state.packet(&packet.id);
            *counts.entry(runtime.status.to_string()).or_default() += 1;
            if runtime.status == PacketStatus::InProgress {
                active_assignments.push(json!({
                    "packet_id": packet.id,
                    "agent": runtime.assigned_to,
                    "started_at": runtime.started_at,
                }));
            }
        }

        let mut ready_packets = self.ready()?;
        let mut blocked_packets = Vec::new();
        for packet in &self.definition().packets {
            let status = state.packet_status(&packet.id);
            let blockers: Vec<Value> = self
                .expanded_dependencies()
                .get(&packet.id)
                .map(|deps| {
                    deps.iter()
                        .filter(|dep| state.packet_status(dep) != PacketStatus::Done)
                        .map(|dep| {
                            json!({"packet_id": dep, "status": state.packet_status(dep).to_string()})
                        })
                        .collect()
                })
                .unwrap_or_default();
            if !blockers.is_empty()
                && matches!(status, PacketStatus::Pending | PacketStatus::Blocked)
            {
                blocked_packets.push(json!({
                    "id": packet.id,
                    "wbs_ref": packet.wbs_ref,
                    "title": packet.title,
                    "status": status.to_string(),
                    "blockers": blockers,
                }));
            }
        }

        let recent_events = recent_events.clamp(1, 200);
        let mut all_events: Vec<ActivityEvent> = state.log.iter().rev().cloned().collect();
        let mut truncated = all_events.len() > recent_events;
        all_events.truncate(recent_events);

        let mut limits: BTreeMap<String, usize> = BTreeMap::new();
        limits.insert("recent_events".to_string(), recent_events);
        if compact {
            const COMPACT_LIMIT: usize = 10;
            for (list_len, name) in [
                (ready_packets.len(), "ready_packets"),
                (blocked_packets.len(), "blocked_packets"),
                (active_assignments.len(), "active_assignments"),
            ] {
                if list_len > COMPACT_LIMIT {
                    truncated = true;
                }
                limits.insert(name.to_string(), COMPACT_LIMIT);
            }
            ready_packets.truncate(COMPACT_LIMIT);
            blocked_packets.truncate(COMPACT_LIMIT);
            active_assignments.truncate(COMPACT_LIMIT);
        }

        Ok(Briefing {
            schema_id: "wbs.briefing".to_string(),
            schema_version: "1.0".to_string(),
            generated_at: now_utc(),
            mode: if compact { "compact" } else { "full" }.to_string(),
            truncated,
            limits,
            project: json!({
                "project_name": metadata.project_name,
                "approved_by": metadata.approved_by,
                "approved_at": metadata.approved_at,
            }),
            counts,
            ready_packets,
            blocked_packets,
            active_assignments,
            recent_events: all_events,
        })
    }

    /// Assemble the context bundle for one packet.
    pub fn context_bundle(
        &self,
        packet_id: &str,
        limits: BundleLimits,
    ) -> Result<ContextBundle, EngineError> {
        let state = self.load_state()?;
        let definition = self
            .definition()
            .find_packet(packet_id)
            .ok_or_else(|| EngineError::not_found(format!("Packet {packet_id} not found")))?;
        let packet_state = state.packet(packet_id);

        let max_events = limits.max_events.clamp(1, 200);
        let max_handovers = limits.max_handovers.clamp(1, 200);
        let max_notes_bytes = limits.max_notes_bytes.clamp(200, 32_000);

        let mut notes_bytes_dropped = 0usize;
        let (notes, dropped) = truncate_text(packet_state.notes.as_deref(), max_notes_bytes);
        notes_bytes_dropped += dropped;
        let runtime_state = json!({
            "status": packet_state.status.to_string(),
            "assigned_to": packet_state.assigned_to,
            "started_at": packet_state.started_at,
            "completed_at": packet_state.completed_at,
            "notes": notes,
        });

        let upstream: Vec<Value> = self
            .expanded_dependencies()
            .get(packet_id)
            .map(|deps| {
                deps.iter()
                    .map(|dep| {
                        json!({"packet_id": dep, "status": state.packet_status(dep).to_string()})
                    })
                    .collect()
            })
            .unwrap_or_default();
        let downstream: Vec<Value> = self
            .expanded_dependencies()
            .iter()
            .filter(|(_, sources)| sources.iter().any(|s| s == packet_id))
            .map(|(target, _)| {
                json!({"packet_id": target, "status": state.packet_status(target).to_string()})
            })
            .collect();

        let full_history: Vec<&ActivityEvent> = state
            .log
            .iter()
            .filter(|e| e.packet_id == packet_id)
            .collect();
        let history_dropped = full_history.len().saturating_sub(max_events);
        let mut history: Vec<ActivityEvent> = full_history
            .into_iter()
            .rev()
            .take(max_events)
            .cloned()
            .collect();
        for event in &mut history {
            let (notes, dropped) = truncate_text(event.notes.as_deref(), max_notes_bytes);
            event.notes = notes;
            notes_bytes_dropped += dropped;
        }

        let handovers_dropped = packet_state.handovers.len().saturating_sub(max_handovers);
        let mut handovers: Vec<Handover> = packet_state
            .handovers
            .iter()
            .skip(handovers_dropped)
            .cloned()
            .collect();
        for handover in &mut handovers {
            let (reason, dropped) = truncate_text(Some(handover.reason.as_str()), max_notes_bytes);
            handover.reason = reason.unwrap_or_default();
            notes_bytes_dropped += dropped;
            let (progress, dropped) =
                truncate_text(Some(handover.progress_notes.as_str()), max_notes_bytes);
            handover.progress_notes = progress.unwrap_or_default();
            notes_bytes_dropped += dropped;
        }

        let definition_value = serde_json::to_value(definition).map_err(EngineError::io)?;
        let mut texts = Vec::new();
        collect_text_values(&definition_value, &mut texts);
        collect_text_values(&runtime_state, &mut texts);
        collect_text_values(
            &serde_json::to_value(&history).map_err(EngineError::io)?,
            &mut texts,
        );
        collect_text_values(
            &serde_json::to_value(&handovers).map_err(EngineError::io)?,
            &mut texts,
        );
        let file_manifest = self.extract_file_manifest(&texts);

        let truncated = history_dropped > 0 || handovers_dropped > 0 || notes_bytes_dropped > 0;
        let mut limit_map = BTreeMap::new();
        limit_map.insert("max_events".to_string(), max_events);
        limit_map.insert("max_notes_bytes".to_string(), max_notes_bytes);
        limit_map.insert("max_handovers".to_string(), max_handovers);

        Ok(ContextBundle {
            schema_id: "wbs.context_bundle".to_string(),
            schema_version: "1.0".to_string(),
            generated_at: now_utc(),
            mode: if limits.compact { "compact" } else { "full" }.to_string(),
            truncated,
            limits: limit_map,
            packet_id: packet_id.to_string(),
            packet_definition: definition_value,
            runtime_state,
            dependencies: json!({"upstream": upstream, "downstream": downstream}),
            history,
            handovers,
            file_manifest,
            truncation: json!({
                "history_dropped": history_dropped,
                "handovers_dropped": handovers_dropped,
                "notes_bytes_dropped": notes_bytes_dropped,
            }),
        })
    }

    /// Scan free text for path-like tokens and report their existence
    /// relative to the governance root. URLs are excluded; extensionless
    /// bare tokens are ignored.
    fn extract_file_manifest(&self, texts: &[String]) -> Vec<Value> {
        let mut candidates: Vec<String> = Vec::new();
        for text in texts {
            for token in TOKEN_RE.find_iter(text) {
                let token = token
                    .as_str()
                    .trim_matches(|c: char| ".,;:()[]{}<>\"'`".contains(c));
                if token.is_empty()
                    || token.starts_with("http://")
                    || token.starts_with("https://")
                    || token.starts_with("//")
                {
                    continue;
                }
                let token = token.trim_start_matches("./");
                if token.is_empty() {
                    continue;
                }
                let extension = token.rsplit('.').next().unwrap_or_default();
                if !token.contains('/') && !MANIFEST_EXTENSIONS.contains(&extension) {
                    continue;
                }
                candidates.push(token.to_string());
            }
        }
        candidates.sort();
        candidates.dedup();

        candidates
            .into_iter()
            .map(|rel| {
                let target = self.root().join(&rel);
                let exists = target.is_file();
                json!({"path": rel, "exists": exists})
            })
            .collect()
    }
}
