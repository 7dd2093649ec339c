//! Audit mirror: an optional post-commit observer.
//!
//! The mirror is a sink, never a prerequisite. The kernel stays correct
//! when no mirror is configured or a configured mirror fails; failures are
//! logged as warnings and dropped.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::OpenOptions;
use std::io::Write;

use packetgov_dcl::DclCommit;

/// Replicates commit envelopes into an external append-only store.
pub trait AuditMirror: Send + Sync {
    fn record(&self, commit: &DclCommit) -> anyhow::Result<()>;
}

/// Mirror that appends each commit as one JSON line.
#[derive(Debug, Clone)]
pub struct JsonlMirror {
    path: Utf8PathBuf,
}

impl JsonlMirror {
    #[must_use]
    pub fn new(path: &Utf8Path) -> Self {
        Self {
            path: path.to_owned(),
        }
    }
}

impl AuditMirror for JsonlMirror {
    fn record(&self, commit: &DclCommit) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            packetgov_utils::paths::ensure_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())?;
        let mut line = serde_json::to_vec(commit)?;
        line.push(b'\n');
        file.write_all(&line)?;
        Ok(())
    }
}
