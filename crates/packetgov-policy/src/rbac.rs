//! Role-based action authorization for the HTTP surface.

use std::collections::HashSet;

pub const ROLE_OPERATOR: &str = "operator";
pub const ROLE_REVIEWER: &str = "reviewer";
pub const ROLE_SUPERVISOR: &str = "supervisor";
pub const ROLE_ADMIN: &str = "admin";

fn role_actions(role: &str) -> HashSet<&'static str> {
    match role {
        ROLE_OPERATOR => ["claim", "done", "fail", "note"].into_iter().collect(),
        ROLE_REVIEWER => HashSet::new(),
        ROLE_SUPERVISOR => ["reset", "closeout_l2"].into_iter().collect(),
        ROLE_ADMIN => ["*"].into_iter().collect(),
        _ => HashSet::new(),
    }
}

/// Whether a role may perform an action. Admin is a wildcard.
#[must_use]
pub fn role_allows(role: &str, action: &str) -> bool {
    let allowed = role_actions(role.trim().to_lowercase().as_str());
    allowed.contains("*") || allowed.contains(action)
}
