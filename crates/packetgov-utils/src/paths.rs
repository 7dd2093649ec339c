//! Filesystem layout for a governance root.
//!
//! All per-process state is explicit: every path is a pure function of the
//! kernel root, and tests instantiate kernels rooted at temp directories.
//! Layout under `<root>`:
//!
//! ```text
//! <root>/constitution.md
//! <root>/.governance/wbs.json
//! <root>/.governance/wbs-state.json
//! <root>/.governance/agents.json
//! <root>/.governance/dcl-config.json
//! <root>/.governance/dcl/packets/<packet_id>/...
//! <root>/.governance/dcl/project-checkpoints/...
//! ```

use camino::{Utf8Path, Utf8PathBuf};

/// Returns `<root>/.governance`
#[must_use]
pub fn governance_dir(root: &Utf8Path) -> Utf8PathBuf {
    root.join(".governance")
}

/// Returns `<root>/.governance/wbs.json`
#[must_use]
pub fn wbs_path(root: &Utf8Path) -> Utf8PathBuf {
    governance_dir(root).join("wbs.json")
}

/// Returns `<root>/.governance/wbs-state.json`
#[must_use]
pub fn state_path(root: &Utf8Path) -> Utf8PathBuf {
    governance_dir(root).join("wbs-state.json")
}

/// Returns `<root>/.governance/agents.json`
#[must_use]
pub fn agent_registry_path(root: &Utf8Path) -> Utf8PathBuf {
    governance_dir(root).join("agents.json")
}

/// Returns `<root>/.governance/dcl-config.json`
#[must_use]
pub fn dcl_config_path(root: &Utf8Path) -> Utf8PathBuf {
    governance_dir(root).join("dcl-config.json")
}

/// Returns `<root>/.governance/dcl`
#[must_use]
pub fn dcl_root(root: &Utf8Path) -> Utf8PathBuf {
    governance_dir(root).join("dcl")
}

/// Returns `<root>/constitution.md`
#[must_use]
pub fn constitution_path(root: &Utf8Path) -> Utf8PathBuf {
    root.join("constitution.md")
}

/// mkdir -p; treat `AlreadyExists` as success (removes TOCTTOU races)
pub fn ensure_dir_all<P: AsRef<std::path::Path>>(p: P) -> std::io::Result<()> {
    match std::fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted() {
        let root = Utf8Path::new("/work/project");
        assert_eq!(wbs_path(root), "/work/project/.governance/wbs.json");
        assert_eq!(state_path(root), "/work/project/.governance/wbs-state.json");
        assert_eq!(dcl_root(root), "/work/project/.governance/dcl");
        assert_eq!(constitution_path(root), "/work/project/constitution.md");
        assert_eq!(
            dcl_config_path(root),
            "/work/project/.governance/dcl-config.json"
        );
    }

    #[test]
    fn ensure_dir_all_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir_all(&nested).unwrap();
        ensure_dir_all(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
