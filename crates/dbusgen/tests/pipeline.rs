//! End-to-end pipeline runs against a canned bus and a fake generator.

use dbusgen::app::artifacts::ArtifactStore;
use dbusgen::app::pipeline::{Pipeline, Stage};
use dbusgen::domain::errors::BusError;
use dbusgen::domain::model::{ArtifactKind, GeneratorOptions};
use dbusgen::infra::bus::Introspect;
use dbusgen::infra::config::Config;

const SAMPLE: &str = r#"<node name="/com/example/sample">
  <interface name="com.example.Sample">
    <method name="Ping">
      <arg type="s" direction="out"/>
    </method>
    <signal name="Pinged"/>
  </interface>
  <interface name="org.freedesktop.DBus.Introspectable">
    <method name="Introspect">
      <arg type="s" direction="out"/>
    </method>
  </interface>
  <interface name="org.freedesktop.DBus.Properties"/>
  <interface name="org.freedesktop.DBus.Peer"/>
</node>"#;

struct CannedBus;

impl Introspect for CannedBus {
    fn introspect(
        &self,
        _service: &str,
        _object_path: &str,
        _interface: &str,
    ) -> Result<String, BusError> {
        Ok(SAMPLE.to_owned())
    }
}

fn fetch_sample() -> (Pipeline, Config) {
    let config = Config::default();
    let mut pipeline = Pipeline::new();
    pipeline
        .fetch(
            &CannedBus,
            "com.example.sample",
            "/com/example/sample",
            "org.freedesktop.DBus.Introspectable",
            &config.filter.exclude,
        )
        .expect("canned fetch succeeds");
    (pipeline, config)
}

#[test]
fn default_selection_excludes_exactly_the_boilerplate_names() {
    let (pipeline, _config) = fetch_sample();
    let included: Vec<_> = pipeline
        .tree()
        .units()
        .iter()
        .map(|unit| (unit.name.as_str(), unit.included))
        .collect();
    assert_eq!(
        included,
        [
            ("com.example.Sample", true),
            ("org.freedesktop.DBus.Introspectable", false),
            ("org.freedesktop.DBus.Properties", false),
            ("org.freedesktop.DBus.Peer", false),
        ]
    );
}

#[test]
fn filtered_document_keeps_only_the_selected_interfaces() {
    let (pipeline, _config) = fetch_sample();
    let text = pipeline.filtered_document();
    assert!(text.starts_with("<!DOCTYPE node PUBLIC"));
    assert!(text.contains(r#"<node name="/com/example/sample">"#));
    assert!(text.contains("com.example.Sample"));
    assert!(text.contains(r#"<signal name="Pinged"/>"#));
    assert!(!text.contains("org.freedesktop.DBus.Properties"));
    assert!(!text.contains("org.freedesktop.DBus.Peer"));
}

#[cfg(unix)]
mod with_fake_generator {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use super::*;

    fn fake_generator(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-generator.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn options(out: &Path, class_name: Option<&str>) -> GeneratorOptions {
        GeneratorOptions {
            namespace_off: true,
            single_class_name: class_name.is_some(),
            class_name: class_name.unwrap_or_default().to_owned(),
            base_name: "sample".into(),
            output_dir: out.to_path_buf(),
        }
    }

    #[test]
    fn full_cycle_relocates_all_artifacts() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let program = fake_generator(
            work.path(),
            "printf '%s ' \"$@\" > received-args.txt\ntouch sample_interface.h sample_interface.cpp",
        );

        let (mut pipeline, _config) = fetch_sample();
        let options = options(out.path(), Some("SampleInterface"));
        let artifacts = pipeline
            .generate(&options, program.to_str().unwrap(), work.path())
            .unwrap();
        assert_eq!(pipeline.stage(), Stage::Generated);

        // Exactly one interface is included, so the class flag is honored.
        let received = fs::read_to_string(work.path().join("received-args.txt")).unwrap();
        assert_eq!(
            received.trim(),
            "-N -p sample_interface.h:sample_interface.cpp -c SampleInterface sample.xml"
        );

        let store = ArtifactStore::new(out.path(), "sample");
        let placed = pipeline.relocate(&store, &artifacts).unwrap();
        assert_eq!(pipeline.stage(), Stage::Relocated);
        assert_eq!(placed.len(), 3);
        assert!(out.path().join("sample.xml").exists());
        assert!(out.path().join("sample_interface.h").exists());
        assert!(out.path().join("sample_interface.cpp").exists());
        assert!(!work.path().join("sample.xml").exists());

        let xml = store.read_back(ArtifactKind::Xml).unwrap();
        assert!(xml.contains("com.example.Sample"));
    }

    #[test]
    fn class_flag_is_dropped_once_a_second_interface_is_included() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let program = fake_generator(
            work.path(),
            "printf '%s ' \"$@\" > received-args.txt\ntouch sample_interface.h sample_interface.cpp",
        );

        let (mut pipeline, _config) = fetch_sample();
        assert!(pipeline.set_included("org.freedesktop.DBus.Peer", true));
        assert_eq!(pipeline.stage(), Stage::Filtered);

        pipeline
            .generate(
                &options(out.path(), Some("SampleInterface")),
                program.to_str().unwrap(),
                work.path(),
            )
            .unwrap();

        let received = fs::read_to_string(work.path().join("received-args.txt")).unwrap();
        assert_eq!(
            received.trim(),
            "-N -p sample_interface.h:sample_interface.cpp sample.xml"
        );
    }

    #[test]
    fn failed_generation_leaves_relocated_artifacts_untouched() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let good = fake_generator(
            work.path(),
            "touch sample_interface.h sample_interface.cpp",
        );

        let (mut pipeline, _config) = fetch_sample();
        let options = options(out.path(), None);
        let artifacts = pipeline
            .generate(&options, good.to_str().unwrap(), work.path())
            .unwrap();
        let store = ArtifactStore::new(out.path(), "sample");
        pipeline.relocate(&store, &artifacts).unwrap();
        let header_before = fs::read_to_string(out.path().join("sample_interface.h")).unwrap();

        let bad = work.path().join("missing-generator");
        let err = pipeline
            .generate(&options, bad.to_str().unwrap(), work.path())
            .unwrap_err();
        assert!(err.to_string().contains("failed to launch"));

        // The working copy of the XML stays for inspection, the relocated
        // artifacts are untouched.
        assert!(work.path().join("sample.xml").exists());
        assert_eq!(
            fs::read_to_string(out.path().join("sample_interface.h")).unwrap(),
            header_before
        );
    }
}
