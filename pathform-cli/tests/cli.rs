use assert_cmd::cargo::{self};
use predicates::str::contains;

#[test]
fn prints_help() {
    let mut cmd = cargo::cargo_bin_cmd!("pathform");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("pathform"));
}

#[test]
fn reports_errors_for_an_invalid_edit() {
    let schema = r#"{
        "type": "object",
        "properties": {
            "name": {
                "type": "object",
                "properties": {
                    "first": {"type": "string", "minLength": 1}
                }
            }
        }
    }"#;

    let mut cmd = cargo::cargo_bin_cmd!("pathform");
    cmd.args(["--schema", schema, "--set", "name.first="])
        .assert()
        .failure()
        .stdout(contains("name.first"));
}

#[test]
fn clean_edits_exit_zero_and_print_the_merged_value() {
    let schema = r#"{
        "type": "object",
        "properties": {
            "name": {
                "type": "object",
                "properties": {
                    "first": {"type": "string", "minLength": 1}
                }
            }
        }
    }"#;

    let mut cmd = cargo::cargo_bin_cmd!("pathform");
    cmd.args(["--schema", schema, "--set", "name.first=amy"])
        .assert()
        .success()
        .stdout(contains("amy"));
}
