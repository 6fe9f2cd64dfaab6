//! Test helpers for composing CLI workspaces and input files.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::TimeZone;
use tempfile::TempDir;

use super::*;

pub(super) const WEIGHTS_JSON: &str = r#"[
  {"touchpoint": "case_study", "base_weight": 10.0, "stage_default": "diagnosis", "category": "mid"},
  {"touchpoint": "demo_request", "base_weight": 40.0, "stage_default": "solution", "category": "pos"}
]"#;

pub(super) const EVENTS_JSON: &str = r#"[
  {
    "event_id": "evt-1",
    "occurred_at": "2026-06-15T09:00:00Z",
    "actor_email": "Ada@Example.com",
    "company_domain": "example.com",
    "touchpoint": "case_study",
    "depth_pct_complete": 80.0
  },
  {
    "event_id": "evt-2",
    "occurred_at": "2026-06-15T09:30:00Z",
    "actor_email": "ada@example.com",
    "company_domain": "example.com",
    "touchpoint": "demo_request"
  }
]"#;

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.path("foura.db")
    }

    /// Write the standard event and weight fixtures, returning their paths.
    pub(super) fn write_inputs(&self) -> (Utf8PathBuf, Utf8PathBuf) {
        let events = self.path("events.json");
        let weights = self.path("weights.json");
        write_utf8(&events, EVENTS_JSON.as_bytes());
        write_utf8(&weights, WEIGHTS_JSON.as_bytes());
        (events, weights)
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace").field("root", &self.root).finish()
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path, contents).expect("write fixture file");
}

pub(super) fn target(workspace: &Workspace, prefix: &str) -> database::DatabaseTarget {
    database::DatabaseTarget {
        path: workspace.database(),
        table_prefix: prefix.to_owned(),
    }
}
