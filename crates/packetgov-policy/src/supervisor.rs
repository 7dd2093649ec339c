//! Supervisor policy: the deterministic authorization filter in front of
//! every mutating transition.

use camino::Utf8PathBuf;

use crate::registry::AgentRegistry;

/// Actions that mutate packet state and therefore require an agent.
const MUTATING_ACTIONS: &[&str] = &[
    "claim",
    "done",
    "note",
    "fail",
    "handover",
    "resume",
    "closeout_l2",
];

/// A proposed transition, as presented to the supervisor.
#[derive(Debug, Clone, Default)]
pub struct TransitionRequest {
    pub packet_id: String,
    pub action: String,
    pub agent: Option<String>,
    pub notes: Option<String>,
    pub required_capabilities: Vec<String>,
}

/// Supervisor decision: allowed plus a reason string.
///
/// An allowed verdict may still carry a non-`approved` reason (advisory
/// capability warnings); callers surface those alongside success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub reason: String,
}

impl Verdict {
    #[must_use]
    pub fn approved() -> Self {
        Self {
            allowed: true,
            reason: "approved".to_string(),
        }
    }

    #[must_use]
    pub fn allowed_with(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }

    /// A warning reason worth logging alongside an allowed transition.
    #[must_use]
    pub fn warning(&self) -> Option<&str> {
        if self.allowed && self.reason != "approved" && !self.reason.is_empty() {
            Some(&self.reason)
        } else {
            None
        }
    }
}

/// Deterministic authorization of transitions.
///
/// Implementations must be pure functions of the request and their
/// configuration snapshot; the engine consults the supervisor before
/// touching state.
pub trait Supervisor: Send + Sync {
    fn approve(&self, req: &TransitionRequest) -> Verdict;
}

/// Policy knobs for the default supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorPolicy {
    pub require_notes_on_done: bool,
    pub require_agent_for_mutation: bool,
    pub agent_registry_path: Option<Utf8PathBuf>,
}

impl Default for SupervisorPolicy {
    fn default() -> Self {
        Self {
            require_notes_on_done: true,
            require_agent_for_mutation: true,
            agent_registry_path: None,
        }
    }
}

/// Default deterministic authority policy for packet transitions.
pub struct DeterministicSupervisor {
    policy: SupervisorPolicy,
}

impl DeterministicSupervisor {
    #[must_use]
    pub fn new(policy: SupervisorPolicy) -> Self {
        Self { policy }
    }

    fn registry(&self) -> AgentRegistry {
        self.policy
            .agent_registry_path
            .as_deref()
            .and_then(|path| AgentRegistry::load(path).ok())
            .unwrap_or_default()
    }
}

impl Default for DeterministicSupervisor {
    fn default() -> Self {
        Self::new(SupervisorPolicy::default())
    }
}

impl Supervisor for DeterministicSupervisor {
    fn approve(&self, req: &TransitionRequest) -> Verdict {
        if self.policy.require_agent_for_mutation
            && MUTATING_ACTIONS.contains(&req.action.as_str())
            && req.agent.as_deref().unwrap_or("").trim().is_empty()
        {
            return Verdict::denied("Supervisor denied: agent required");
        }

        if self.policy.require_notes_on_done
            && req.action == "done"
            && req.notes.as_deref().unwrap_or("").trim().is_empty()
        {
            return Verdict::denied("Supervisor denied: completion notes required for done");
        }

        if req.action == "claim" {
            let registry = self.registry();
            let (ok, message) = registry.check_capabilities(
                &req.required_capabilities,
                req.agent.as_deref().unwrap_or(""),
            );
            if !ok {
                return Verdict::denied(message);
            }
            if !message.is_empty() {
                return Verdict::allowed_with(message);
            }
        }

        Verdict::approved()
    }
}

/// Supervisor that approves everything; useful for tests and for callers
/// that inject their own policy upstream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSupervisor;

impl Supervisor for NoopSupervisor {
    fn approve(&self, _req: &TransitionRequest) -> Verdict {
        Verdict::approved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AgentProfile, EnforcementMode};
    use tempfile::TempDir;

    fn request(action: &str, agent: Option<&str>, notes: Option<&str>) -> TransitionRequest {
        TransitionRequest {
            packet_id: "PKT-001".to_string(),
            action: action.to_string(),
            agent: agent.map(str::to_string),
            notes: notes.map(str::to_string),
            required_capabilities: vec![],
        }
    }

    #[test]
    fn mutation_without_agent_is_denied() {
        let supervisor = DeterministicSupervisor::default();
        for action in ["claim", "done", "note", "fail", "handover", "resume", "closeout_l2"] {
            let verdict = supervisor.approve(&request(action, None, Some("n")));
            assert!(!verdict.allowed, "{action} should require an agent");
            assert!(verdict.reason.contains("agent required"));
        }
    }

    #[test]
    fn blank_agent_counts_as_missing() {
        let supervisor = DeterministicSupervisor::default();
        let verdict = supervisor.approve(&request("claim", Some("   "), None));
        assert!(!verdict.allowed);
    }

    #[test]
    fn done_without_notes_is_denied() {
        let supervisor = DeterministicSupervisor::default();
        let verdict = supervisor.approve(&request("done", Some("alice"), None));
        assert!(!verdict.allowed);
        assert!(verdict.reason.contains("completion notes required"));

        let verdict = supervisor.approve(&request("done", Some("alice"), Some("  ")));
        assert!(!verdict.allowed);
    }

    #[test]
    fn done_with_notes_is_approved() {
        let supervisor = DeterministicSupervisor::default();
        let verdict = supervisor.approve(&request("done", Some("alice"), Some("shipped")));
        assert_eq!(verdict, Verdict::approved());
    }

    #[test]
    fn read_actions_need_no_agent() {
        let supervisor = DeterministicSupervisor::default();
        let verdict = supervisor.approve(&request("reset", None, None));
        assert!(verdict.allowed);
    }

    #[test]
    fn claim_checks_capabilities_via_registry() {
        let dir = TempDir::new().unwrap();
        let path =
            camino::Utf8PathBuf::from_path_buf(dir.path().join("agents.json")).unwrap();
        AgentRegistry {
            enforcement_mode: EnforcementMode::Strict,
            agents: vec![AgentProfile {
                id: "alice".to_string(),
                r#type: None,
                capabilities: vec!["code".to_string()],
                constraints: None,
            }],
            ..Default::default()
        }
        .save(&path)
        .unwrap();

        let supervisor = DeterministicSupervisor::new(SupervisorPolicy {
            agent_registry_path: Some(path),
            ..Default::default()
        });

        let mut req = request("claim", Some("alice"), None);
        req.required_capabilities = vec!["deploy".to_string()];
        let verdict = supervisor.approve(&req);
        assert!(!verdict.allowed);
        assert!(verdict.reason.contains("missing required capabilities"));

        req.required_capabilities = vec!["code".to_string()];
        assert_eq!(supervisor.approve(&req), Verdict::approved());
    }

    #[test]
    fn advisory_warning_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let path =
            camino::Utf8PathBuf::from_path_buf(dir.path().join("agents.json")).unwrap();
        AgentRegistry {
            enforcement_mode: EnforcementMode::Advisory,
            ..Default::default()
        }
        .save(&path)
        .unwrap();

        let supervisor = DeterministicSupervisor::new(SupervisorPolicy {
            agent_registry_path: Some(path),
            ..Default::default()
        });

        let mut req = request("claim", Some("ghost"), None);
        req.required_capabilities = vec!["code".to_string()];
        let verdict = supervisor.approve(&req);
        assert!(verdict.allowed);
        assert!(verdict.warning().unwrap().contains("not registered"));
    }

    #[test]
    fn noop_supervisor_approves_everything() {
        let supervisor = NoopSupervisor;
        let verdict = supervisor.approve(&request("done", None, None));
        assert_eq!(verdict, Verdict::approved());
    }

    #[test]
    fn approved_verdict_has_no_warning() {
        assert!(Verdict::approved().warning().is_none());
        assert!(Verdict::denied("no").warning().is_none());
        assert_eq!(
            Verdict::allowed_with("Capability warning: x").warning(),
            Some("Capability warning: x")
        );
    }
}
