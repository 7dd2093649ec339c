//! Shared helpers for integration tests: temp-rooted projects.
#![allow(dead_code)] // not every test binary uses every helper

use camino::Utf8PathBuf;
use serde_json::Value;
use tempfile::TempDir;

use packetgov::Engine;
use packetgov_engine::engine::REQUIRED_DRIFT_SECTIONS;
use packetgov_utils::paths;

/// A governance project rooted in a temp directory.
pub struct Project {
    pub dir: TempDir,
    pub root: Utf8PathBuf,
}

impl Project {
    /// Create a project with the given WBS definition.
    pub fn new(wbs: &Value) -> Self {
        let dir = TempDir::new().expect("create temp project");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let wbs_path = paths::wbs_path(&root);
        paths::ensure_dir_all(wbs_path.parent().unwrap()).unwrap();
        std::fs::write(
            wbs_path.as_std_path(),
            serde_json::to_string_pretty(wbs).unwrap(),
        )
        .unwrap();
        Self { dir, root }
    }

    /// Linear chain A <- B plus helpers used by most scenarios.
    pub fn linear() -> Self {
        Self::new(&serde_json::json!({
            "metadata": {"project_name": "linear"},
            "work_areas": [{"id": "1.0", "title": "Core"}],
            "packets": [
                {"id": "A", "area_id": "1.0", "title": "First"},
                {"id": "B", "area_id": "1.0", "title": "Second"}
            ],
            "dependencies": {"B": ["A"]}
        }))
    }

    /// Chain A <- B <- C plus independent D.
    pub fn cascade() -> Self {
        Self::new(&serde_json::json!({
            "metadata": {"project_name": "cascade"},
            "work_areas": [{"id": "1.0", "title": "Core"}],
            "packets": [
                {"id": "A", "area_id": "1.0"},
                {"id": "B", "area_id": "1.0"},
                {"id": "C", "area_id": "1.0"},
                {"id": "D", "area_id": "1.0"}
            ],
            "dependencies": {"B": ["A"], "C": ["B"]}
        }))
    }

    pub fn engine(&self) -> Engine {
        Engine::open(&self.root).expect("open engine")
    }

    /// Write a drift assessment containing every required section.
    pub fn write_assessment(&self, name: &str) -> String {
        let path = self.dir.path().join(name);
        let mut content = String::new();
        for section in REQUIRED_DRIFT_SECTIONS {
            content.push_str(section);
            content.push_str("\nreviewed, no drift\n\n");
        }
        std::fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }
}
