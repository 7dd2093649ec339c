//! Tag-based dependency resolution and cycle detection.
//!
//! Dependencies may reference packets directly by id or by `tag:<name>`;
//! tags expand to every packet carrying the tag. Expansion happens once at
//! load time and the expanded graph is cached in runtime state.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

use crate::definition::{PacketDefinition, WbsDefinition, WbsError};

// Tag syntax: lowercase alphanumeric segments joined by single hyphens.
static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap());
static TAG_REF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tag:([a-z0-9]+(-[a-z0-9]+)*)$").unwrap());

/// Validate a tag name (without the `tag:` prefix).
#[must_use]
pub fn validate_tag_name(tag_name: &str) -> bool {
    TAG_PATTERN.is_match(tag_name)
}

/// Check whether a dependency string is a tag reference.
#[must_use]
pub fn is_tag_reference(dependency: &str) -> bool {
    dependency.starts_with("tag:")
}

/// Extract the tag name from a `tag:<name>` reference.
#[must_use]
pub fn extract_tag_name(tag_ref: &str) -> Option<&str> {
    TAG_REF_PATTERN
        .captures(tag_ref)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Index of packet tags for tag-to-packet-id resolution.
#[derive(Debug, Default)]
pub struct TagIndex {
    index: HashMap<String, Vec<String>>,
}

impl TagIndex {
    /// Build the index from packet definitions, preserving declaration order.
    #[must_use]
    pub fn build(packets: &[PacketDefinition]) -> Self {
        let mut index: HashMap<String, Vec<String>> = HashMap::new();
        for packet in packets {
            for tag in &packet.tags {
                if !validate_tag_name(tag) {
                    warn!(packet_id = %packet.id, tag = %tag, "invalid tag, skipping");
                    continue;
                }
                index
                    .entry(tag.clone())
                    .or_default()
                    .push(packet.id.clone());
            }
        }
        Self { index }
    }

    /// Resolve a tag name to the packet ids carrying it.
    #[must_use]
    pub fn resolve(&self, tag_name: &str) -> &[String] {
        self.index.get(tag_name).map_or(&[], Vec::as_slice)
    }

    /// All tag names, sorted.
    #[must_use]
    pub fn all_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.index.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

/// Expands tag references into explicit packet ids.
///
/// Unions are deduplicated while preserving first-seen order; explicit ids
/// pass through untouched.
#[derive(Debug)]
pub struct DependencyExpander<'a> {
    tag_index: &'a TagIndex,
}

impl<'a> DependencyExpander<'a> {
    #[must_use]
    pub fn new(tag_index: &'a TagIndex) -> Self {
        Self { tag_index }
    }

    /// Expand one dependency list.
    #[must_use]
    pub fn expand(&self, dependencies: &[String]) -> Vec<String> {
        let mut expanded = Vec::new();
        let mut seen = HashSet::new();

        for dep in dependencies {
            if is_tag_reference(dep) {
                let Some(tag_name) = extract_tag_name(dep) else {
                    warn!(reference = %dep, "invalid tag reference, skipping");
                    continue;
                };
                let packet_ids = self.tag_index.resolve(tag_name);
                if packet_ids.is_empty() {
                    warn!(tag = %tag_name, "tag matches no packets");
                }
                for packet_id in packet_ids {
                    if seen.insert(packet_id.clone()) {
                        expanded.push(packet_id.clone());
                    }
                }
            } else if seen.insert(dep.clone()) {
                expanded.push(dep.clone());
            }
        }

        expanded
    }

    /// Expand every dependency list in the mapping.
    #[must_use]
    pub fn expand_all(
        &self,
        dependencies: &BTreeMap<String, Vec<String>>,
    ) -> BTreeMap<String, Vec<String>> {
        dependencies
            .iter()
            .map(|(packet_id, deps)| (packet_id.clone(), self.expand(deps)))
            .collect()
    }
}

/// Detect a cycle in the expanded dependency graph.
///
/// Returns the cycle as a path from the first revisited node back to itself
/// (e.g. `["A", "B", "C", "A"]`), or `None` for a DAG.
#[must_use]
pub fn detect_cycle(dependencies: &BTreeMap<String, Vec<String>>) -> Option<Vec<String>> {
    fn visit(
        node: &str,
        dependencies: &BTreeMap<String, Vec<String>>,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        if rec_stack.contains(node) {
            let start = path.iter().position(|n| n == node)?;
            let mut cycle = path[start..].to_vec();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if visited.contains(node) {
            return None;
        }

        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        if let Some(deps) = dependencies.get(node) {
            for dep in deps {
                if let Some(cycle) = visit(dep, dependencies, visited, rec_stack, path) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
        None
    }

    let mut visited = HashSet::new();
    for node in dependencies.keys() {
        if !visited.contains(node.as_str()) {
            let mut rec_stack = HashSet::new();
            let mut path = Vec::new();
            if let Some(cycle) = visit(node, dependencies, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(cycle);
            }
        }
    }
    None
}

/// Expand all tag references with full validation.
///
/// The main entry point for WBS load: builds the tag index, expands every
/// edge, verifies edges against declared packets, and rejects cycles.
pub fn expand_dependencies_with_validation(
    definition: &WbsDefinition,
) -> Result<BTreeMap<String, Vec<String>>, WbsError> {
    let tag_index = TagIndex::build(&definition.packets);
    let expander = DependencyExpander::new(&tag_index);
    let expanded = expander.expand_all(&definition.dependencies);

    definition.validate_edges(&expanded)?;

    if let Some(cycle) = detect_cycle(&expanded) {
        return Err(WbsError::CircularDependency {
            path: cycle.join(" -> "),
        });
    }

    Ok(expanded)
}

/// Invert the expanded graph: dependency -> packets that depend on it.
#[must_use]
pub fn reverse_edges(
    dependencies: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, Vec<String>> {
    let mut reversed: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (packet_id, deps) in dependencies {
        for dep in deps {
            reversed
                .entry(dep.clone())
                .or_default()
                .push(packet_id.clone());
        }
    }
    reversed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn packets(entries: &[(&str, &[&str])]) -> Vec<PacketDefinition> {
        entries
            .iter()
            .map(|(id, tags)| {
                serde_json::from_value(json!({
                    "id": id,
                    "tags": tags,
                }))
                .unwrap()
            })
            .collect()
    }

    fn deps(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(id, list)| {
                (
                    (*id).to_string(),
                    list.iter().map(|s| (*s).to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn tag_names_follow_the_grammar() {
        assert!(validate_tag_name("frontend"));
        assert!(validate_tag_name("api-v2"));
        assert!(validate_tag_name("a1-b2-c3"));
        assert!(!validate_tag_name("Frontend"));
        assert!(!validate_tag_name("has_underscore"));
        assert!(!validate_tag_name("-leading"));
        assert!(!validate_tag_name("trailing-"));
        assert!(!validate_tag_name(""));
    }

    #[test]
    fn tag_reference_extraction() {
        assert_eq!(extract_tag_name("tag:frontend"), Some("frontend"));
        assert_eq!(extract_tag_name("tag:api-v2"), Some("api-v2"));
        assert_eq!(extract_tag_name("tag:Bad"), None);
        assert_eq!(extract_tag_name("PKT-001"), None);
        assert!(is_tag_reference("tag:x"));
        assert!(!is_tag_reference("PKT-001"));
    }

    #[test]
    fn index_preserves_declaration_order() {
        let pkts = packets(&[
            ("FRONT-001", &["frontend", "ui"]),
            ("FRONT-002", &["frontend"]),
            ("BACK-001", &["backend"]),
        ]);
        let index = TagIndex::build(&pkts);
        assert_eq!(index.resolve("frontend"), ["FRONT-001", "FRONT-002"]);
        assert_eq!(index.resolve("ui"), ["FRONT-001"]);
        assert_eq!(index.resolve("missing"), Vec::<String>::new().as_slice());
    }

    #[test]
    fn invalid_tags_are_skipped() {
        let pkts = packets(&[("PKT-001", &["Good_No", "good-yes"])]);
        let index = TagIndex::build(&pkts);
        assert_eq!(index.all_tags(), vec!["good-yes"]);
    }

    #[test]
    fn expansion_unions_and_dedups() {
        let pkts = packets(&[
            ("FRONT-001", &["frontend"]),
            ("FRONT-002", &["frontend"]),
            ("BACK-001", &["backend"]),
        ]);
        let index = TagIndex::build(&pkts);
        let expander = DependencyExpander::new(&index);

        let expanded = expander.expand(&[
            "tag:frontend".to_string(),
            "CORE-001".to_string(),
            "tag:backend".to_string(),
            "FRONT-001".to_string(), // already present via tag
        ]);
        assert_eq!(expanded, ["FRONT-001", "FRONT-002", "CORE-001", "BACK-001"]);
    }

    #[test]
    fn expansion_is_idempotent() {
        let pkts = packets(&[("A", &["t"]), ("B", &["t"])]);
        let index = TagIndex::build(&pkts);
        let expander = DependencyExpander::new(&index);

        let once = expander.expand(&["tag:t".to_string(), "C".to_string()]);
        let twice = expander.expand(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn acyclic_graph_has_no_cycle() {
        let graph = deps(&[("A", &["B"]), ("B", &["C"]), ("C", &[])]);
        assert_eq!(detect_cycle(&graph), None);
    }

    #[test]
    fn cycle_is_reported_as_closed_path() {
        let graph = deps(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"])]);
        let cycle = detect_cycle(&graph).unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.len() >= 3);
        // Every hop must be an edge of the input graph.
        for pair in cycle.windows(2) {
            assert!(graph[&pair[0]].contains(&pair[1]));
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = deps(&[("A", &["A"])]);
        let cycle = detect_cycle(&graph).unwrap();
        assert_eq!(cycle, ["A", "A"]);
    }

    #[test]
    fn disconnected_components_are_all_checked() {
        let graph = deps(&[("A", &["B"]), ("B", &[]), ("X", &["Y"]), ("Y", &["X"])]);
        let cycle = detect_cycle(&graph).unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.contains(&"X".to_string()));
    }

    #[test]
    fn full_expansion_rejects_cycles() {
        let definition: WbsDefinition = serde_json::from_value(json!({
            "packets": [
                {"id": "A", "tags": ["core"]},
                {"id": "B"}
            ],
            "dependencies": {
                "A": ["B"],
                "B": ["tag:core"]
            }
        }))
        .unwrap();
        assert!(matches!(
            expand_dependencies_with_validation(&definition),
            Err(WbsError::CircularDependency { .. })
        ));
    }

    #[test]
    fn full_expansion_resolves_tags() {
        let definition: WbsDefinition = serde_json::from_value(json!({
            "packets": [
                {"id": "FRONT-001", "tags": ["frontend"]},
                {"id": "BACK-001", "tags": ["backend"]},
                {"id": "DEPLOY-001"}
            ],
            "dependencies": {
                "DEPLOY-001": ["tag:frontend", "tag:backend"]
            }
        }))
        .unwrap();
        let expanded = expand_dependencies_with_validation(&definition).unwrap();
        assert_eq!(expanded["DEPLOY-001"], ["FRONT-001", "BACK-001"]);
    }

    #[test]
    fn reverse_edges_inverts_the_graph() {
        let graph = deps(&[("B", &["A"]), ("C", &["A", "B"])]);
        let reversed = reverse_edges(&graph);
        assert_eq!(reversed["A"], ["B", "C"]);
        assert_eq!(reversed["B"], ["C"]);
    }

    proptest::proptest! {
        #[test]
        fn random_dags_never_report_cycles(edges in proptest::collection::vec((0u8..20, 0u8..20), 0..40)) {
            // Force a DAG by orienting every edge from lower to higher index.
            let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (a, b) in edges {
                let (lo, hi) = if a < b { (a, b) } else if b < a { (b, a) } else { continue };
                graph.entry(format!("N{lo}")).or_default().push(format!("N{hi}"));
            }
            proptest::prop_assert_eq!(detect_cycle(&graph), None);
        }

        #[test]
        fn expansion_order_is_stable(ids in proptest::collection::vec("[A-Z]{1,4}", 1..10)) {
            let index = TagIndex::default();
            let expander = DependencyExpander::new(&index);
            let deps: Vec<String> = ids;
            let once = expander.expand(&deps);
            let twice = expander.expand(&once);
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
