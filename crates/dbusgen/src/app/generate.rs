//! Driving the external binding generator.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::domain::errors::GenerationError;
use crate::domain::model::{ArtifactKind, GeneratedArtifact, GeneratorOptions};

/// Build the generator argument list for the current options.
///
/// The class-name flag is emitted only when exactly one unit is included;
/// with more units the stored toggle is ignored.
pub fn build_args(options: &GeneratorOptions, included_units: usize) -> Vec<String> {
    let mut args = Vec::new();
    if options.namespace_off {
        args.push("-N".to_owned());
    }
    args.push("-p".to_owned());
    args.push(format!(
        "{}:{}",
        ArtifactKind::Header.file_name(&options.base_name),
        ArtifactKind::Source.file_name(&options.base_name),
    ));
    if options.single_class_name && included_units == 1 {
        args.push("-c".to_owned());
        args.push(options.class_name.clone());
    }
    args.push(ArtifactKind::Xml.file_name(&options.base_name));
    args
}

/// Write the filtered document and run the generator inside `working_dir`.
///
/// The XML file is written before the generator runs and stays on disk
/// whatever the outcome. Header and source files exist only on success.
pub fn invoke(
    xml_text: &str,
    options: &GeneratorOptions,
    included_units: usize,
    program: &str,
    working_dir: &Path,
) -> Result<Vec<GeneratedArtifact>, GenerationError> {
    let xml_path = working_dir.join(ArtifactKind::Xml.file_name(&options.base_name));
    fs::write(&xml_path, xml_text).map_err(|source| GenerationError::WriteXml {
        path: xml_path.clone(),
        source,
    })?;

    let args = build_args(options, included_units);
    tracing::debug!(program, ?args, "running binding generator");

    let output = Command::new(program)
        .args(&args)
        .current_dir(working_dir)
        .output()
        .map_err(|source| GenerationError::Spawn {
            program: program.to_owned(),
            source,
        })?;

    if !output.status.success() {
        let mut diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        if diagnostics.is_empty() {
            diagnostics = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        }
        return Err(GenerationError::Failed {
            status: output.status.code().unwrap_or(-1),
            diagnostics,
        });
    }

    Ok([ArtifactKind::Xml, ArtifactKind::Header, ArtifactKind::Source]
        .into_iter()
        .map(|kind| GeneratedArtifact {
            kind,
            path: working_dir.join(kind.file_name(&options.base_name)),
        })
        .collect())
}
