//! Remediation hints for domain errors.
//!
//! Hints come from a fixed table keyed by error-substring pattern; the
//! first match wins. Not every error has a hint.

/// Substring-keyed hint table, most specific patterns first.
const HINTS: &[(&str, &str)] = &[
    (
        "not found",
        "Run `packetgov status` to list the known packet and area ids.",
    ),
    (
        "not pending",
        "Only pending packets can be claimed; check current state with `packetgov status`.",
    ),
    (
        "not done yet",
        "Finish the blocking packet first; `packetgov ready` lists claimable packets.",
    ),
    (
        "no active handover",
        "Nothing to resume; claim the packet instead.",
    ),
    (
        "active handover",
        "Resume the handover first: `packetgov resume <packet> <agent>`.",
    ),
    (
        "handover is targeted to",
        "Only the named target agent may resume this handover.",
    ),
    (
        "agent required",
        "Pass the acting agent id for this transition.",
    ),
    (
        "completion notes required",
        "Provide non-empty notes describing the delivered work.",
    ),
    (
        "owned by",
        "Only the assigned agent may act on this packet; hand it over or resume first.",
    ),
    (
        "incomplete packets",
        "Every packet in the area must be done before closeout.",
    ),
    (
        "missing required section",
        "Add the required headings to the drift assessment document.",
    ),
    (
        "already closed",
        "Area closeouts are monotone; the kernel never reopens a closed area.",
    ),
    (
        "waiting for lock",
        "Another process holds the lock; retry, or remove a stale .lock file if its holder crashed.",
    ),
    (
        "schema",
        "This state file was written by a newer packetgov; upgrade before proceeding.",
    ),
    (
        "dcl-config",
        "The dcl-config.json lock disagrees with this kernel's pinned hashing contract.",
    ),
];

/// The first hint whose pattern occurs in the message, if any.
#[must_use]
pub fn hint_for(message: &str) -> Option<&'static str> {
    HINTS
        .iter()
        .find(|(pattern, _)| message.contains(pattern))
        .map(|(_, hint)| *hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_patterns_have_hints() {
        assert!(hint_for("Packet X not found").unwrap().contains("status"));
        assert!(hint_for("Blocked by A (not done yet)").unwrap().contains("ready"));
        assert!(
            hint_for("Packet X has active handover; resume before done")
                .unwrap()
                .contains("resume")
        );
        assert!(hint_for("Supervisor denied: agent required").is_some());
        assert!(hint_for("Timeout waiting for lock: x.lock").is_some());
    }

    #[test]
    fn no_active_handover_beats_active_handover() {
        // Ordering matters: the specific "no active handover" pattern must
        // come before the generic "active handover" entry.
        let hint = hint_for("Packet X has no active handover").unwrap();
        assert!(hint.contains("Nothing to resume"));
    }

    #[test]
    fn unknown_messages_have_no_hint() {
        assert!(hint_for("something inscrutable").is_none());
    }
}
