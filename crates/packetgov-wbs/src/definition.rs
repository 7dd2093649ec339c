//! WBS definition file (`wbs.json`) model and validation.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Errors raised when loading or validating a WBS definition.
#[derive(Error, Debug)]
pub enum WbsError {
    #[error("WBS definition not found: {path}")]
    NotFound { path: String },

    #[error("failed to parse WBS definition: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("duplicate packet id: {id}")]
    DuplicatePacketId { id: String },

    #[error("duplicate work area id: {id}")]
    DuplicateAreaId { id: String },

    #[error("dependency edge references unknown packet: {from} -> {to}")]
    UnknownDependency { from: String, to: String },

    #[error("circular dependency detected: {path}")]
    CircularDependency { path: String },

    #[error("IO error reading WBS definition: {0}")]
    Io(#[from] std::io::Error),
}

/// Project metadata carried in the definition header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WbsMetadata {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub approved_at: Option<String>,
}

/// A level-2 grouping of packets with an explicit closeout ritual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkArea {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An atomic, named, addressable unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketDefinition {
    pub id: String,
    #[serde(default)]
    pub wbs_ref: Option<String>,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_capabilities: Vec<String>,
}

/// The declarative graph of packets and areas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WbsDefinition {
    #[serde(default)]
    pub metadata: WbsMetadata,
    #[serde(default)]
    pub work_areas: Vec<WorkArea>,
    #[serde(default)]
    pub packets: Vec<PacketDefinition>,
    /// Raw dependency edges; values are packet ids or `tag:<name>` references.
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl WbsDefinition {
    /// Load a definition from disk.
    pub fn load(path: &Utf8Path) -> Result<Self, WbsError> {
        let content = match std::fs::read_to_string(path.as_std_path()) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WbsError::NotFound {
                    path: path.to_string(),
                });
            }
            Err(e) => return Err(WbsError::Io(e)),
        };
        let definition: Self = serde_json::from_str(&content).map_err(WbsError::Parse)?;
        definition.validate_ids()?;
        Ok(definition)
    }

    /// Enforce id uniqueness for packets and work areas.
    pub fn validate_ids(&self) -> Result<(), WbsError> {
        let mut packet_ids = HashSet::new();
        for packet in &self.packets {
            if !packet_ids.insert(packet.id.as_str()) {
                return Err(WbsError::DuplicatePacketId {
                    id: packet.id.clone(),
                });
            }
        }
        let mut area_ids = HashSet::new();
        for area in &self.work_areas {
            if !area_ids.insert(area.id.as_str()) {
                return Err(WbsError::DuplicateAreaId {
                    id: area.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Every expanded dependency edge must reference a declared packet.
    pub fn validate_edges(
        &self,
        expanded: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), WbsError> {
        let known: HashSet<&str> = self.packets.iter().map(|p| p.id.as_str()).collect();
        for (from, deps) in expanded {
            if !known.contains(from.as_str()) {
                return Err(WbsError::UnknownDependency {
                    from: from.clone(),
                    to: from.clone(),
                });
            }
            for dep in deps {
                if !known.contains(dep.as_str()) {
                    return Err(WbsError::UnknownDependency {
                        from: from.clone(),
                        to: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Find a packet definition by id.
    #[must_use]
    pub fn find_packet(&self, packet_id: &str) -> Option<&PacketDefinition> {
        self.packets.iter().find(|p| p.id == packet_id)
    }

    /// Find a work area by id.
    #[must_use]
    pub fn find_area(&self, area_id: &str) -> Option<&WorkArea> {
        self.work_areas.iter().find(|a| a.id == area_id)
    }

    /// All packets belonging to a work area.
    #[must_use]
    pub fn area_packets(&self, area_id: &str) -> Vec<&PacketDefinition> {
        self.packets
            .iter()
            .filter(|p| p.area_id.as_deref() == Some(area_id))
            .collect()
    }
}
