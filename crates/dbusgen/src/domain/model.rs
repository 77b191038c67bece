//! Domain models for interface units, generator options, and artifacts.

use std::path::PathBuf;

/// One top-level element of an introspection document, addressable by its
/// `name` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceUnit {
    pub name: String,
    pub fragment: String,
    pub included: bool,
}

/// Naming inputs and toggles for one generator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    pub namespace_off: bool,
    pub single_class_name: bool,
    pub class_name: String,
    pub base_name: String,
    pub output_dir: PathBuf,
}

/// Kinds of files a generation cycle produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Xml,
    Header,
    Source,
}

impl ArtifactKind {
    /// File name derived from the configured base name.
    pub fn file_name(&self, base_name: &str) -> String {
        match self {
            ArtifactKind::Xml => format!("{base_name}.xml"),
            ArtifactKind::Header => format!("{base_name}_interface.h"),
            ArtifactKind::Source => format!("{base_name}_interface.cpp"),
        }
    }
}

/// A produced file together with its current location on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}
