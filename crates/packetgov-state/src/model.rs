//! State file schema.
//!
//! `PacketRuntime` fields serialize unconditionally (nulls included) so the
//! canonical-JSON snapshot of a packet hashes identically before and after
//! round-trips through disk.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::log_integrity::LogMode;
use crate::status::PacketStatus;

/// A recorded transfer of packet ownership between agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handover {
    pub handover_id: String,
    pub from_agent: String,
    pub to_agent: Option<String>,
    pub timestamp: String,
    pub reason: String,
    pub progress_notes: String,
    pub files_modified: Vec<String>,
    pub remaining_work: Vec<String>,
    pub active: bool,
    pub resumed_by: Option<String>,
    pub resumed_at: Option<String>,
}

/// Mutable runtime record for one packet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketRuntime {
    pub status: PacketStatus,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub handovers: Vec<Handover>,
}

impl Default for PacketRuntime {
    fn default() -> Self {
        Self {
            status: PacketStatus::Pending,
            assigned_to: None,
            started_at: None,
            completed_at: None,
            notes: None,
            handovers: Vec::new(),
        }
    }
}

impl PacketRuntime {
    /// The most recent handover still marked active, if any.
    ///
    /// At most one handover per packet is active; the engine enforces that
    /// on write, so the reverse scan is a formality.
    #[must_use]
    pub fn active_handover(&self) -> Option<&Handover> {
        self.handovers.iter().rev().find(|h| h.active)
    }

    /// Mutable access to the active handover.
    pub fn active_handover_mut(&mut self) -> Option<&mut Handover> {
        self.handovers.iter_mut().rev().find(|h| h.active)
    }

    /// Snapshot of this record as a JSON value, for state hashing.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// One entry of the append-only activity log.
///
/// The three chain fields are present together in `hash_chain` mode and
/// absent in `plain` mode; any partial combination is a verification error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub packet_id: String,
    pub event: String,
    pub agent: Option<String>,
    pub timestamp: String,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Extra descriptive fields (migration events carry version metadata).
    /// An empty map flattens to nothing.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ActivityEvent {
    #[must_use]
    pub fn new(packet_id: &str, event: &str, agent: Option<&str>, notes: Option<&str>) -> Self {
        Self {
            packet_id: packet_id.to_string(),
            event: event.to_string(),
            agent: agent.map(str::to_string),
            timestamp: packetgov_utils::now_utc(),
            notes: notes.map(str::to_string),
            event_id: None,
            prev_hash: None,
            hash: None,
            extra: BTreeMap::new(),
        }
    }

    /// True when any of the hash-chain fields is present.
    #[must_use]
    pub fn has_any_chain_field(&self) -> bool {
        self.event_id.is_some() || self.prev_hash.is_some() || self.hash.is_some()
    }

    /// True when all of the hash-chain fields are present.
    #[must_use]
    pub fn has_all_chain_fields(&self) -> bool {
        self.event_id.is_some() && self.prev_hash.is_some() && self.hash.is_some()
    }
}

/// Closeout record for a level-2 work area. Monotone: once closed, the
/// kernel never reopens it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaCloseout {
    pub status: String,
    pub area_title: Option<String>,
    pub closed_by: String,
    pub closed_at: String,
    pub drift_assessment_path: String,
    pub notes: Option<String>,
    pub integrity_method: String,
}

/// Top-level runtime state document (`wbs-state.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeState {
    pub version: String,
    pub schema_version: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub packets: BTreeMap<String, PacketRuntime>,
    #[serde(default)]
    pub log: Vec<ActivityEvent>,
    #[serde(default)]
    pub area_closeouts: BTreeMap<String, AreaCloseout>,
    #[serde(default)]
    pub log_integrity_mode: LogMode,
    #[serde(default)]
    pub expanded_dependencies: BTreeMap<String, Vec<String>>,
}

impl RuntimeState {
    /// Runtime record for a packet, or a fresh pending default.
    #[must_use]
    pub fn packet(&self, packet_id: &str) -> PacketRuntime {
        self.packets.get(packet_id).cloned().unwrap_or_default()
    }

    /// Status for a packet, defaulting to pending for untouched packets.
    #[must_use]
    pub fn packet_status(&self, packet_id: &str) -> PacketStatus {
        self.packets
            .get(packet_id)
            .map_or(PacketStatus::Pending, |p| p.status)
    }

    /// Ensure a runtime record exists for every listed packet id.
    ///
    /// Packets present in the WBS are auto-instantiated as `pending` on
    /// first load.
    pub fn ensure_packets<'a, I: IntoIterator<Item = &'a str>>(&mut self, packet_ids: I) {
        for id in packet_ids {
            self.packets.entry(id.to_string()).or_default();
        }
    }
}
