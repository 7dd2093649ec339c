//! Work-breakdown structure: the declarative graph of packets and areas.
//!
//! The definition is read-mostly input; this crate models it, validates its
//! structural invariants (unique ids, resolvable edges, acyclic graph), and
//! expands `tag:<name>` dependency references into explicit packet ids.

pub mod definition;
pub mod resolver;

pub use definition::{PacketDefinition, WbsDefinition, WbsError, WorkArea, WbsMetadata};
pub use resolver::{
    DependencyExpander, TagIndex, detect_cycle, expand_dependencies_with_validation,
    is_tag_reference, validate_tag_name,
};
