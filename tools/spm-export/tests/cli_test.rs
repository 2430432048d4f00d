//! Tests for the spm-export command line

mod intermediate_generator;

use intermediate_generator as generator;
use std::process::Command;
use tempfile::tempdir;

fn spm_export() -> Command {
    Command::new(env!("CARGO_BIN_EXE_spm-export"))
}

#[test]
fn test_compile_command() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = dir.path().join("prop.spm");
    generator::write_scenery(&base);

    let status = spm_export()
        .arg("compile")
        .arg(&base)
        .args(["--normals", "--vertex-color"])
        .status()
        .expect("Failed to run spm-export");
    assert!(status.success());

    let file = spm_export::read_spm(&std::fs::read(&base).unwrap()).unwrap();
    assert!(file.header.has_normals());
    assert!(file.header.has_vertex_color());
    assert!(!file.header.has_tangents());
}

#[test]
fn test_config_file_and_flag_override() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = dir.path().join("track.spm");
    let config = dir.path().join("spm.toml");
    generator::write_scenery(&base);
    std::fs::write(&config, "export_tangents = true\n[sectors]\nsize = 50.0\n").unwrap();

    let status = spm_export()
        .arg("compile")
        .arg(&base)
        .arg("--config")
        .arg(&config)
        .arg("--space-partition")
        .status()
        .expect("Failed to run spm-export");
    assert!(status.success());

    let file = spm_export::read_spm(&std::fs::read(&base).unwrap()).unwrap();
    assert_eq!(file.header.mesh_type, spm_export::MeshType::StaticSectored);
    assert!(file.header.has_tangents());
}

#[test]
fn test_missing_input_is_not_an_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = dir.path().join("absent.spm");

    let status = spm_export()
        .arg("compile")
        .arg(&base)
        .status()
        .expect("Failed to run spm-export");
    assert!(status.success());
    assert!(!base.exists());
}

#[test]
fn test_inspect_command() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = dir.path().join("kart.spm");
    generator::write_skinned_scene(&base);

    let status = spm_export()
        .arg("compile")
        .arg(&base)
        .args(["--armatures", "1"])
        .status()
        .expect("Failed to run spm-export");
    assert!(status.success());

    let output = spm_export()
        .arg("inspect")
        .arg(&base)
        .output()
        .expect("Failed to run spm-export");
    assert!(output.status.success());
    let log = String::from_utf8_lossy(&output.stdout);
    assert!(log.contains("SPMA"), "unexpected output: {log}");
}

#[test]
fn test_inspect_rejects_garbage() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("garbage.spm");
    std::fs::write(&path, b"not a mesh").unwrap();

    let status = spm_export()
        .arg("inspect")
        .arg(&path)
        .status()
        .expect("Failed to run spm-export");
    assert!(!status.success());
}
