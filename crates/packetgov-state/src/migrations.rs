//! Versioned state migrations.
//!
//! Migrations are explicit, registered by `(from_version, to_version, name,
//! fn)` and applied in chain order until the state reaches the current
//! schema version. Each application appends a `state_migrated` event to the
//! activity log so the upgrade itself is part of the audit trail. Unknown
//! future versions fail fast.

use serde_json::{Value, json};

use packetgov_utils::now_utc;

use crate::store::{CURRENT_SCHEMA_VERSION, STATE_VERSION, StateError};

/// A single registered migration step.
pub struct Migration {
    pub from: &'static str,
    pub to: &'static str,
    pub name: &'static str,
    pub apply: fn(&mut Value),
}

/// Record of a migration that was applied during load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub from: String,
    pub to: String,
    pub name: String,
}

/// The migration chain, oldest first.
#[must_use]
pub fn registry() -> Vec<Migration> {
    vec![
        Migration {
            from: "0",
            to: "1.0",
            name: "v0_baseline",
            apply: migrate_v0_to_v1,
        },
        Migration {
            from: "1.0",
            to: "1.1",
            name: "add_schema_version",
            apply: migrate_v1_0_to_v1_1,
        },
    ]
}

/// Effective schema version of a raw state document.
///
/// Legacy unversioned files report "0"; files from before the explicit
/// `schema_version` field report their envelope version.
#[must_use]
pub fn version_of(value: &Value) -> String {
    match value.get("version").and_then(Value::as_str) {
        None => "0".to_string(),
        Some(STATE_VERSION) => value
            .get("schema_version")
            .and_then(Value::as_str)
            .unwrap_or(STATE_VERSION)
            .to_string(),
        Some(other) => other.to_string(),
    }
}

/// Run the migration chain to the current schema version.
///
/// Returns the applied steps (empty when the state was already current) so
/// the store can persist the upgraded document before anyone observes it.
pub fn run(value: &mut Value) -> Result<Vec<AppliedMigration>, StateError> {
    let registry = registry();
    let mut applied = Vec::new();

    loop {
        let current = version_of(value);
        if current == CURRENT_SCHEMA_VERSION {
            return Ok(applied);
        }
        let Some(step) = registry.iter().find(|m| m.from == current) else {
            return Err(StateError::UnsupportedVersion { version: current });
        };

        (step.apply)(value);
        append_migration_event(value, step);
        applied.push(AppliedMigration {
            from: step.from.to_string(),
            to: step.to.to_string(),
            name: step.name.to_string(),
        });
    }
}

fn append_migration_event(value: &mut Value, step: &Migration) {
    let event = json!({
        "packet_id": "SYSTEM",
        "event": "state_migrated",
        "agent": "system",
        "timestamp": now_utc(),
        "notes": format!("migrated state {} -> {}", step.from, step.to),
        "from_version": step.from,
        "to_version": step.to,
        "migration_name": step.name,
        "automatic": true,
    });
    if let Some(log) = value.get_mut("log").and_then(Value::as_array_mut) {
        log.push(event);
    }
}

/// Upgrade legacy unversioned state to the 1.0 envelope.
fn migrate_v0_to_v1(value: &mut Value) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    let now = now_utc();
    obj.entry("version").or_insert_with(|| json!(STATE_VERSION));
    obj.entry("created_at").or_insert_with(|| json!(now.clone()));
    obj.entry("updated_at").or_insert_with(|| json!(now));
    obj.entry("packets").or_insert_with(|| json!({}));
    obj.entry("log").or_insert_with(|| json!([]));
    obj.entry("area_closeouts").or_insert_with(|| json!({}));
    obj.entry("log_integrity_mode").or_insert_with(|| json!("plain"));
}

/// Add the explicit `schema_version` field introduced in 1.1.
fn migrate_v1_0_to_v1_1(value: &mut Value) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    obj.entry("log").or_insert_with(|| json!([]));
    obj.insert("schema_version".to_string(), json!("1.1"));
    obj.entry("expanded_dependencies").or_insert_with(|| json!({}));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_state_needs_no_migration() {
        let mut value = json!({
            "version": "1.0",
            "schema_version": "1.1",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
            "packets": {},
            "log": [],
        });
        let applied = run(&mut value).unwrap();
        assert!(applied.is_empty());
    }

    #[test]
    fn legacy_unversioned_state_migrates_fully() {
        let mut value = json!({"packets": {"A": {"status": "done"}}});
        let applied = run(&mut value).unwrap();

        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].name, "v0_baseline");
        assert_eq!(applied[1].name, "add_schema_version");
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["schema_version"], "1.1");
        assert_eq!(value["packets"]["A"]["status"], "done");
    }

    #[test]
    fn v1_0_gains_schema_version() {
        let mut value = json!({
            "version": "1.0",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
            "packets": {},
            "log": [],
            "area_closeouts": {},
        });
        let applied = run(&mut value).unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(value["schema_version"], "1.1");
    }

    #[test]
    fn migration_events_are_appended() {
        let mut value = json!({"packets": {}});
        run(&mut value).unwrap();

        let log = value["log"].as_array().unwrap();
        assert_eq!(log.len(), 2);
        for event in log {
            assert_eq!(event["event"], "state_migrated");
            assert_eq!(event["agent"], "system");
            assert_eq!(event["automatic"], true);
            assert!(event["migration_name"].is_string());
            assert!(event["timestamp"].as_str().unwrap().ends_with('Z'));
        }
        assert_eq!(log[0]["from_version"], "0");
        assert_eq!(log[0]["to_version"], "1.0");
        assert_eq!(log[1]["from_version"], "1.0");
        assert_eq!(log[1]["to_version"], "1.1");
    }

    #[test]
    fn future_version_fails_fast() {
        let mut value = json!({
            "version": "1.0",
            "schema_version": "9.9",
            "packets": {},
        });
        assert!(matches!(
            run(&mut value),
            Err(StateError::UnsupportedVersion { version }) if version == "9.9"
        ));
    }

    #[test]
    fn version_detection() {
        assert_eq!(version_of(&json!({})), "0");
        assert_eq!(version_of(&json!({"version": "1.0"})), "1.0");
        assert_eq!(
            version_of(&json!({"version": "1.0", "schema_version": "1.1"})),
            "1.1"
        );
        // A future envelope version is reported as-is, never mistaken for
        // a migratable 1.0 document.
        assert_eq!(version_of(&json!({"version": "2.0"})), "2.0");
    }

    #[test]
    fn future_envelope_version_fails_fast() {
        let mut value = json!({"version": "2.0", "packets": {}});
        assert!(matches!(
            run(&mut value),
            Err(StateError::UnsupportedVersion { version }) if version == "2.0"
        ));
    }
}
