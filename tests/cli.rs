use std::fs;

use assert_cmd::Command;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("iiif-trainset").unwrap();
    cmd.env_remove("IIIF_TRAINSET_CONFIG");
    cmd
}

#[test]
fn runs() {
    cmd()
        .assert()
        .success()
        .stdout(predicates::str::contains("--help"));
}

#[test]
fn outputs_tool_name() {
    cmd()
        .arg("-V")
        .assert()
        .success()
        .stdout("iiif-trainset 0.1.0\n");
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("convert"))
        .stdout(predicates::str::contains("faces"));
}

#[test]
fn convert_without_sources_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    cmd()
        .args(["convert", "--no-cache", "--output"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("no sources given"));
}

#[test]
fn convert_rejects_non_url_source() {
    cmd()
        .args(["convert", "--no-cache", "--source", "not a url"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("is not a URL"));
}

#[test]
fn convert_rejects_unknown_object_mode() {
    cmd()
        .args([
            "convert",
            "--source",
            "https://example.org/list.json",
            "--object-mode",
            "per-image",
        ])
        .assert()
        .failure();
}

#[test]
fn config_with_unknown_field_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let config = temp.path().join("run.yaml");
    fs::write(&config, "batch_sise: 4\n").expect("write config");

    cmd()
        .args(["convert", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicates::str::contains("Failed to parse config"));
}

#[test]
fn faces_rejects_zero_batch_size() {
    cmd()
        .args([
            "faces",
            "--manifest",
            "https://example.org/manifest.json",
            "--batch-size",
            "0",
        ])
        .assert()
        .failure()
        .stderr(predicates::str::contains("batch_size must be at least 1"));
}

#[test]
fn faces_rejects_large_upsample() {
    cmd()
        .args([
            "faces",
            "--manifest",
            "https://example.org/manifest.json",
            "--upsample",
            "4",
        ])
        .assert()
        .failure()
        .stderr(predicates::str::contains("upsample must be at most 3"));
}

#[test]
fn faces_requires_model() {
    cmd()
        .args(["faces", "--manifest", "https://example.org/manifest.json"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("no face model given"));
}

#[test]
fn faces_with_missing_model_file_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    cmd()
        .args(["faces", "--manifest", "https://example.org/manifest.json", "--model"])
        .arg(temp.path().join("missing.bin"))
        .assert()
        .failure();
}
