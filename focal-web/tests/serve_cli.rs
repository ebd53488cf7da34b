mod common;

use std::fs;

use tempfile::tempdir;

use common::focal_web;

#[test]
fn help_lists_override_flags() {
    let dir = tempdir().expect("tempdir");
    let output = focal_web(dir.path()).arg("--help").output().expect("run binary");
    assert!(output.status.success());

    let help = String::from_utf8_lossy(&output.stdout);
    for flag in [
        "--config",
        "--model",
        "--variant",
        "--output-width",
        "--format",
        "--scratch-dir",
        "--telemetry",
    ] {
        assert!(help.contains(flag), "missing {flag} in help:\n{help}");
    }
}

#[test]
fn missing_model_fails_at_startup() {
    let dir = tempdir().expect("tempdir");
    let output = focal_web(dir.path())
        .args(["--model", "nowhere/model.onnx", "--port", "0"])
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("model file not found"), "stderr was:\n{stderr}");
}

#[test]
fn invalid_variant_is_rejected_by_the_parser() {
    let dir = tempdir().expect("tempdir");
    let output = focal_web(dir.path())
        .args(["--variant", "deluxe"])
        .output()
        .expect("run binary");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown variant"));
}

#[test]
fn broken_settings_file_is_reported() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("settings.json");
    fs::write(&config, "{ not json").expect("write settings");

    let output = focal_web(dir.path())
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run binary");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to parse settings JSON"));
}
