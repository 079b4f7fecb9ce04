use assert_cmd::Command;
use ferritin_test_data::TestFile;
use std::fs;

#[test]
fn test_cli_canonicalize() {
    let (smifile, _tmp) = TestFile::smiles_02().create_temp().unwrap();
    let output = tempfile::NamedTempFile::new().unwrap();

    let mut cmd = Command::cargo_bin("ferritin-chem").unwrap();
    cmd.arg("canonicalize")
        .arg("--input")
        .arg(&smifile)
        .arg("--output")
        .arg(output.path());
    let assert = cmd.assert().success();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("3 unique, 1 duplicates, 3 failed"), "{stderr}");

    let text = fs::read_to_string(output.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["CCO", "CCN", "[Na+].[Cl-]"]);
}

#[test]
fn test_cli_canonicalize_no_stereo() {
    let (smifile, _tmp) = TestFile::smiles_01().create_temp().unwrap();
    let output = tempfile::NamedTempFile::new().unwrap();

    let mut cmd = Command::cargo_bin("ferritin-chem").unwrap();
    cmd.arg("canonicalize")
        .arg("--input")
        .arg(&smifile)
        .arg("--output")
        .arg(output.path())
        .arg("--no-stereo");
    cmd.assert().success();

    let text = fs::read_to_string(output.path()).unwrap();
    assert_eq!(text.lines().count(), 8);
    assert!(!text.contains('@'));
}

#[test]
fn test_cli_fingerprint() {
    let (smifile, _tmp) = TestFile::smiles_02().create_temp().unwrap();
    let output = tempfile::NamedTempFile::new().unwrap();

    let mut cmd = Command::cargo_bin("ferritin-chem").unwrap();
    cmd.arg("fingerprint")
        .arg("--input")
        .arg(&smifile)
        .arg("--output")
        .arg(output.path())
        .arg("--length")
        .arg("1024");
    cmd.assert().success();

    let text = fs::read_to_string(output.path()).unwrap();
    let records: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0]["smiles"], "CCO");
    assert_eq!(records[0]["length"], 1024);
    assert!(records
        .iter()
        .all(|r| r["on_bits"].as_array().is_some_and(|bits| !bits.is_empty())));
}

#[test]
fn test_cli_missing_input() {
    let mut cmd = Command::cargo_bin("ferritin-chem").unwrap();
    cmd.arg("canonicalize")
        .arg("--input")
        .arg("does/not/exist.smi")
        .arg("--output")
        .arg("unused.smi");
    cmd.assert().failure();
}
