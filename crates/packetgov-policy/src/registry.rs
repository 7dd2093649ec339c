//! Agent capability registry (`agents.json`).

use camino::Utf8Path;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;

use packetgov_utils::{atomic_write_json, atomic_write::read_json_opt};

/// Capability tags recognized by default.
pub const DEFAULT_CAPABILITY_TAXONOMY: &[&str] =
    &["code", "test", "docs", "review", "research", "deploy"];

/// How capability requirements are enforced on claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnforcementMode {
    Disabled,
    #[default]
    Advisory,
    Strict,
}

impl EnforcementMode {
    /// Normalize a mode token; unknown values fall back to advisory.
    #[must_use]
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "disabled" => Self::Disabled,
            "strict" => Self::Strict,
            _ => Self::Advisory,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Advisory => "advisory",
            Self::Strict => "strict",
        }
    }
}

impl Serialize for EnforcementMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EnforcementMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::normalize(&raw))
    }
}

/// One registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Value>,
}

/// The agent registry document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistry {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub enforcement_mode: EnforcementMode,
    #[serde(default = "default_taxonomy")]
    pub capability_taxonomy: Vec<String>,
    #[serde(default)]
    pub agents: Vec<AgentProfile>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_taxonomy() -> Vec<String> {
    DEFAULT_CAPABILITY_TAXONOMY
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self {
            version: default_version(),
            enforcement_mode: EnforcementMode::Disabled,
            capability_taxonomy: default_taxonomy(),
            agents: Vec::new(),
        }
    }
}

impl AgentRegistry {
    /// Load the registry; a missing file yields the permissive default.
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        Ok(read_json_opt(path)?.unwrap_or_default())
    }

    /// Persist the registry atomically.
    pub fn save(&self, path: &Utf8Path) -> anyhow::Result<()> {
        atomic_write_json(path, self)
    }

    /// Profile for an agent id, if registered.
    #[must_use]
    pub fn profile(&self, agent_id: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.id == agent_id)
    }

    /// Check an agent against required capabilities.
    ///
    /// Returns `(allowed, reason)`; in advisory mode a failing check still
    /// allows with a warning reason, in strict mode it denies. An empty
    /// requirement list or disabled enforcement always passes cleanly.
    #[must_use]
    pub fn check_capabilities(&self, required: &[String], agent_id: &str) -> (bool, String) {
        let required: Vec<&str> = required
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if self.enforcement_mode == EnforcementMode::Disabled || required.is_empty() {
            return (true, String::new());
        }

        let taxonomy: BTreeSet<&str> = self
            .capability_taxonomy
            .iter()
            .map(|c| c.trim())
            .collect();
        let unknown_required: BTreeSet<&str> = required
            .iter()
            .filter(|c| !taxonomy.contains(**c))
            .copied()
            .collect();

        let profile = self.profile(agent_id);
        let agent_caps: BTreeSet<&str> = profile
            .map(|p| p.capabilities.iter().map(|c| c.trim()).collect())
            .unwrap_or_default();
        let missing: Vec<&str> = required
            .iter()
            .filter(|c| !agent_caps.contains(**c))
            .copied()
            .collect();

        let mut issues = Vec::new();
        if profile.is_none() {
            issues.push(format!("agent '{agent_id}' is not registered"));
        }
        if !missing.is_empty() {
            issues.push(format!(
                "missing required capabilities: {}",
                missing.join(", ")
            ));
        }
        if !unknown_required.is_empty() {
            issues.push(format!(
                "unknown required capability tags: {}",
                unknown_required
                    .iter()
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        if issues.is_empty() {
            return (true, String::new());
        }
        let detail = issues.join("; ");
        match self.enforcement_mode {
            EnforcementMode::Strict => (false, format!("Capability check: {detail}")),
            _ => (true, format!("Capability warning: {detail}")),
        }
    }
}
