//! The fetch → filter → generate → relocate cycle.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::app::artifacts::ArtifactStore;
use crate::app::document;
use crate::app::generate;
use crate::app::tree::InterfaceTree;
use crate::domain::errors::{BusError, GenerationError};
use crate::domain::model::{GeneratedArtifact, GeneratorOptions};
use crate::infra::bus::Introspect;

/// Progress of the current generation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    #[default]
    Idle,
    Fetched,
    Filtered,
    Generated,
    Relocated,
}

/// Owns the selection and walks it through one generation cycle at a time.
///
/// Every step blocks until it completes or fails; there is no cancellation.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    tree: InterfaceTree,
    document: String,
    stage: Stage,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn tree(&self) -> &InterfaceTree {
        &self.tree
    }

    /// Raw document text as fetched from the bus.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Fetch a fresh document, discarding the previous selection and all
    /// downstream state.
    pub fn fetch(
        &mut self,
        client: &impl Introspect,
        service: &str,
        object_path: &str,
        interface: &str,
        exclude: &[String],
    ) -> Result<(), BusError> {
        let document = client.introspect(service, object_path, interface)?;
        self.load_document(document, exclude);
        Ok(())
    }

    /// Install an already-fetched document (session restore path).
    pub fn load_document(&mut self, document: String, exclude: &[String]) {
        self.tree = InterfaceTree::parse(&document, exclude);
        self.document = document;
        self.stage = Stage::Fetched;
    }

    /// Toggle one named unit. Editing after generation drops the cycle back
    /// to `Filtered`. Returns `false` when the name is unknown.
    pub fn set_included(&mut self, name: &str, included: bool) -> bool {
        if !self.tree.set_included(name, included) {
            return false;
        }
        self.stage = Stage::Filtered;
        true
    }

    /// Force a recorded stage, used when restoring a persisted session.
    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    /// Regenerate the filtered document text for the current selection.
    pub fn filtered_document(&self) -> String {
        document::regenerate(&self.tree)
    }

    /// Run the generator over the filtered document inside `working_dir`.
    pub fn generate(
        &mut self,
        options: &GeneratorOptions,
        program: &str,
        working_dir: &Path,
    ) -> Result<Vec<GeneratedArtifact>, GenerationError> {
        let xml = self.filtered_document();
        let artifacts = generate::invoke(
            &xml,
            options,
            self.tree.included_count(),
            program,
            working_dir,
        )?;
        self.stage = Stage::Generated;
        Ok(artifacts)
    }

    /// Move the produced artifacts into their final folder.
    pub fn relocate(
        &mut self,
        store: &ArtifactStore,
        artifacts: &[GeneratedArtifact],
    ) -> Result<Vec<GeneratedArtifact>> {
        let placed = store.relocate(artifacts)?;
        self.stage = Stage::Relocated;
        Ok(placed)
    }
}
