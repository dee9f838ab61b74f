//! Integration tests for the isakit CLI
//!
//! These tests run the actual binary against the BII-I-1 fixture and
//! temporary inputs.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the binary to test
fn isakit_cmd() -> Command {
    let mut cmd = Command::cargo_bin("isakit").unwrap();
    cmd.env_remove("ISAKIT_SETTINGS").env("RUST_LOG", "off");
    cmd
}

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/BII-I-1")
}

fn copy_fixture(to: &Path) {
    for name in ["i_investigation.txt", "s_BII-S-1.txt", "a_metabolome.txt"] {
        fs::copy(fixture().join(name), to.join(name)).unwrap();
    }
}

const SAMPLETAB: &str = "\
[MSI]
Submission Title\tMouse liver samples
Submission Identifier\tGSB-718
Submission Release Date\t2012-04-01
Person Last Name\tSmith
Term Source Name\tNCBI Taxonomy
[SCD]
Sample Name\tSample Accession\tDerived From\tCharacteristic[organism]\tTerm Source REF\tTerm Source ID
mouse1\tSAMEA1\t\tMus musculus\tNCBI Taxonomy\t10090
liver1\tSAMEA2\tSAMEA1\tMus musculus\tNCBI Taxonomy\t10090
";

#[test]
fn test_help_flag() {
    isakit_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ISA-Tab and ISA-JSON toolkit"));
}

#[test]
fn test_validate_help() {
    isakit_cmd()
        .args(["validate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--config-dir"))
        .stdout(predicate::str::contains("--strict"));
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn test_validate_fixture() {
    isakit_cmd()
        .arg("validate")
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_validate_json_report() {
    let output = isakit_cmd()
        .arg("validate")
        .arg(fixture())
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["errors"], serde_json::json!([]));
    assert_eq!(report["validation_finished"], serde_json::json!(true));
}

#[test]
fn test_validate_unknown_parameter_fails() {
    let dir = TempDir::new().unwrap();
    copy_fixture(dir.path());
    let study = fs::read_to_string(dir.path().join("s_BII-S-1.txt")).unwrap();
    fs::write(
        dir.path().join("s_BII-S-1.txt"),
        study.replace("Parameter Value[rate]", "Parameter Value[dilution]"),
    )
    .unwrap();

    isakit_cmd()
        .arg("validate")
        .arg(dir.path())
        .arg("--no-config")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[1009]"));
}

#[test]
fn test_validate_missing_investigation() {
    let dir = TempDir::new().unwrap();
    isakit_cmd()
        .arg("validate")
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("[0005]"));
}

#[test]
fn test_validate_broken_json() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("broken.json");
    fs::write(&file, "{\"studies\": [").unwrap();
    isakit_cmd()
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("[0001]"));
}

#[test]
fn test_validate_missing_config_dir() {
    let dir = TempDir::new().unwrap();
    isakit_cmd()
        .arg("validate")
        .arg(fixture())
        .arg("--config-dir")
        .arg(dir.path().join("configs"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("[4001]"));
}

#[test]
fn test_validate_strict_unused_protocol() {
    let dir = TempDir::new().unwrap();
    copy_fixture(dir.path());
    let investigation = fs::read_to_string(dir.path().join("i_investigation.txt")).unwrap();
    fs::write(
        dir.path().join("i_investigation.txt"),
        investigation
            .replace(
                "Study Protocol Name\tgrowth protocol\tmetabolite extraction\tmass spectrometry",
                "Study Protocol Name\tgrowth protocol\tmetabolite extraction\tmass spectrometry\tidle",
            )
            .replace(
                "Study Protocol Type\tsample collection\textraction\tmass spectrometry",
                "Study Protocol Type\tsample collection\textraction\tmass spectrometry\tstorage",
            ),
    )
    .unwrap();

    isakit_cmd().arg("validate").arg(dir.path()).assert().success();
    isakit_cmd()
        .arg("validate")
        .arg(dir.path())
        .arg("--strict")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[1019]"));
}

#[test]
fn test_batch_validate() {
    let dir = TempDir::new().unwrap();
    let tab = dir.path().join("BII-I-1");
    fs::create_dir(&tab).unwrap();
    copy_fixture(&tab);
    fs::write(dir.path().join("broken.json"), "not json").unwrap();

    isakit_cmd()
        .arg("batch-validate")
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("2 documents"))
        .stdout(predicate::str::contains("broken.json"));
}

// ============================================================================
// convert / merge
// ============================================================================

#[test]
fn test_convert_tab_to_json_and_back() {
    let dir = TempDir::new().unwrap();
    let json = dir.path().join("BII-I-1.json");
    isakit_cmd()
        .arg("convert")
        .arg(fixture())
        .arg(&json)
        .args(["--to", "json"])
        .assert()
        .success();
    let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(document["identifier"], "BII-I-1");

    let tab = dir.path().join("tab");
    isakit_cmd()
        .arg("convert")
        .arg(&json)
        .arg(&tab)
        .args(["--to", "tab"])
        .assert()
        .success();
    assert!(tab.join("i_investigation.txt").exists());
    assert!(tab.join("a_metabolome.txt").exists());

    isakit_cmd().arg("validate").arg(&tab).assert().success();
}

#[test]
fn test_convert_rejects_unknown_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, "hello").unwrap();
    isakit_cmd()
        .arg("convert")
        .arg(&input)
        .arg(dir.path().join("out.json"))
        .args(["--to", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_merge_to_stdout() {
    isakit_cmd()
        .arg("merge")
        .arg(fixture().join("s_BII-S-1.txt"))
        .arg(fixture().join("a_metabolome.txt"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Source Name\t"))
        .stdout(predicate::str::contains("C-0.07-aliquot2.e1"));
}

#[test]
fn test_merge_missing_file_has_fix() {
    let dir = TempDir::new().unwrap();
    isakit_cmd()
        .arg("merge")
        .arg(dir.path().join("s_missing.txt"))
        .arg(fixture().join("a_metabolome.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Fix:"));
}

// ============================================================================
// sampletab
// ============================================================================

#[test]
fn test_sampletab_to_isatab_and_back() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("GSB-718.txt");
    fs::write(&input, SAMPLETAB).unwrap();

    let tab = dir.path().join("tab");
    isakit_cmd()
        .arg("sampletab")
        .arg(&input)
        .arg(&tab)
        .args(["--to", "isatab"])
        .assert()
        .success();
    let study = fs::read_to_string(tab.join("s_GSB-718.txt")).unwrap();
    assert!(study.contains("mouse1"));
    assert!(study.contains("liver1"));

    let back = dir.path().join("back.txt");
    isakit_cmd()
        .arg("sampletab")
        .arg(&tab)
        .arg(&back)
        .args(["--to", "sampletab"])
        .assert()
        .success();
    let text = fs::read_to_string(&back).unwrap();
    assert!(text.starts_with("[MSI]\n"));
    assert!(text.contains("liver1\tSAMEA2\t\tSAMEA1"));
}

#[test]
fn test_sampletab_missing_section() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.txt");
    fs::write(&input, "[MSI]\nSubmission Title\tx\n").unwrap();
    isakit_cmd()
        .arg("sampletab")
        .arg(&input)
        .arg(dir.path().join("out.json"))
        .args(["--to", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[SCD]"));
}

// ============================================================================
// settings
// ============================================================================

#[test]
fn test_bad_settings_file() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("isakit.yaml");
    fs::write(&settings, "log_level: [").unwrap();
    isakit_cmd()
        .arg("--settings")
        .arg(&settings)
        .arg("validate")
        .arg(fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse settings"));
}

#[test]
fn test_settings_from_environment() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("isakit.yaml");
    fs::write(&settings, "tab:\n  write_cell_quotes: true\n").unwrap();
    let out = dir.path().join("out");

    isakit_cmd()
        .env("ISAKIT_SETTINGS", &settings)
        .arg("convert")
        .arg(fixture())
        .arg(&out)
        .args(["--to", "tab"])
        .assert()
        .success();
    let study = fs::read_to_string(out.join("s_BII-S-1.txt")).unwrap();
    assert!(study.starts_with("\"Source Name\""));
}
