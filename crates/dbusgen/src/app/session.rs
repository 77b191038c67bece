//! Session persistence between CLI invocations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::app::pipeline::{Pipeline, Stage};

const SESSION_DIR: &str = ".dbusgen";
const SESSION_FILE: &str = "session.json";

/// Snapshot of pipeline state persisted between invocations.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Coordinates the document was fetched from.
    pub service: String,
    pub object_path: String,
    /// RFC 3339 timestamp of the fetch.
    pub fetched_at: Option<String>,
    /// Raw introspection text as returned by the bus.
    pub document: String,
    /// Per-unit inclusion state, in document order.
    pub selection: Vec<SelectionRecord>,
    pub stage: Stage,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SelectionRecord {
    pub name: String,
    pub included: bool,
}

impl SessionSnapshot {
    /// Capture the pipeline state for persistence.
    pub fn capture(
        pipeline: &Pipeline,
        service: &str,
        object_path: &str,
        fetched_at: Option<String>,
    ) -> Self {
        Self {
            service: service.to_owned(),
            object_path: object_path.to_owned(),
            fetched_at,
            document: pipeline.document().to_owned(),
            selection: pipeline
                .tree()
                .units()
                .iter()
                .map(|unit| SelectionRecord {
                    name: unit.name.clone(),
                    included: unit.included,
                })
                .collect(),
            stage: pipeline.stage(),
        }
    }

    /// Rebuild a pipeline from the snapshot: reparse the stored document,
    /// replay the recorded inclusion flags, then restore the stage.
    pub fn restore(&self, exclude: &[String]) -> Pipeline {
        let mut pipeline = Pipeline::new();
        if self.document.is_empty() {
            return pipeline;
        }

        pipeline.load_document(self.document.clone(), exclude);
        for record in &self.selection {
            if !pipeline.set_included(&record.name, record.included) {
                tracing::debug!(interface = %record.name, "recorded selection no longer present");
            }
        }
        pipeline.set_stage(self.stage);
        pipeline
    }
}

/// Persists pipeline state to a session file under `.dbusgen/`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    path: PathBuf,
}

impl SessionStore {
    /// Create a new store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let path = root.join(SESSION_DIR).join(SESSION_FILE);
        Self { root, path }
    }

    /// Location of the persisted session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the most recently persisted snapshot.
    pub fn load(&self) -> Result<Option<SessionSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session file at {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&data)
            .with_context(|| format!("invalid session data in {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Persist the provided snapshot to disk, creating parent directories as
    /// needed.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let dir = self.path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create session directory {}", dir.display()))?;

        let data = serde_json::to_string_pretty(snapshot)
            .context("failed to serialize session snapshot")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write session file to {}", self.path.display()))?;
        Ok(())
    }

    /// Remove the session file; absent files are not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove session file {}", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<node>
  <interface name="com.example.App"/>
  <interface name="org.freedesktop.DBus.Peer"/>
</node>"#;

    fn exclude() -> Vec<String> {
        vec!["org.freedesktop.DBus.Peer".into()]
    }

    #[test]
    fn save_and_load_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(temp.path());

        let mut pipeline = Pipeline::new();
        pipeline.load_document(DOC.to_owned(), &exclude());
        pipeline.set_included("org.freedesktop.DBus.Peer", true);

        let snapshot =
            SessionSnapshot::capture(&pipeline, "com.example", "/com/example", None);
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap().expect("snapshot present");
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.stage, Stage::Filtered);
    }

    #[test]
    fn restore_replays_selection_edits_and_stage() {
        let mut pipeline = Pipeline::new();
        pipeline.load_document(DOC.to_owned(), &exclude());
        pipeline.set_included("org.freedesktop.DBus.Peer", true);
        pipeline.set_included("com.example.App", false);
        pipeline.set_stage(Stage::Generated);

        let snapshot = SessionSnapshot::capture(&pipeline, "com.example", "/", None);
        let restored = snapshot.restore(&exclude());

        assert_eq!(restored.stage(), Stage::Generated);
        let included: Vec<_> = restored
            .tree()
            .units()
            .iter()
            .map(|unit| (unit.name.as_str(), unit.included))
            .collect();
        assert_eq!(
            included,
            [("com.example.App", false), ("org.freedesktop.DBus.Peer", true)]
        );
    }

    #[test]
    fn restore_of_an_empty_snapshot_is_idle() {
        let snapshot = SessionSnapshot::default();
        let restored = snapshot.restore(&[]);
        assert_eq!(restored.stage(), Stage::Idle);
        assert!(restored.tree().is_empty());
    }

    #[test]
    fn load_returns_none_when_no_session_exists() {
        let temp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(temp.path());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn clear_tolerates_a_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(temp.path());
        store.clear().unwrap();
    }
}
