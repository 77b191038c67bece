//! Placing generated artifacts and reading them back.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::model::{ArtifactKind, GeneratedArtifact};

/// Moves generator output into the operator-chosen folder and reads it back
/// for display and cleanup.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    base_name: String,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_name: base_name.into(),
        }
    }

    /// Final location of an artifact kind under the output folder.
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.output_dir.join(kind.file_name(&self.base_name))
    }

    /// Move each produced file into the output folder, overwriting any
    /// existing file of the same name.
    pub fn relocate(&self, artifacts: &[GeneratedArtifact]) -> Result<Vec<GeneratedArtifact>> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "failed to create output folder {}",
                self.output_dir.display()
            )
        })?;

        let mut placed = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let target = self.path_for(artifact.kind);
            if target != artifact.path {
                move_file(&artifact.path, &target).with_context(|| {
                    format!(
                        "failed to move {} to {}",
                        artifact.path.display(),
                        target.display()
                    )
                })?;
            }
            placed.push(GeneratedArtifact {
                kind: artifact.kind,
                path: target,
            });
        }
        Ok(placed)
    }

    /// Read a previously relocated artifact, `None` when it was never
    /// produced.
    pub fn read_back(&self, kind: ArtifactKind) -> Option<String> {
        fs::read_to_string(self.path_for(kind)).ok()
    }

    /// Delete the header and XML artifacts if present. Absent files are not
    /// an error.
    pub fn clear(&self) -> Result<()> {
        for kind in [ArtifactKind::Header, ArtifactKind::Xml] {
            remove_if_present(&self.path_for(kind))?;
        }
        Ok(())
    }
}

// rename cannot cross filesystems; fall back to copy + remove.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("failed to remove {}", path.display()))
        }
    }
}
