// Integration tests for the `gridedit` binary.
// Run with: cargo test -p gridedit-cli --test cli_tests

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

/// Binary with its config dir redirected into `home`.
fn gridedit(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gridedit"));
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("GRIDEDIT_SERVER")
        .env_remove("GRIDEDIT_SESSION_COOKIE")
        .env_remove("RUST_LOG");
    cmd
}

fn write_csv(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

fn run_with_stdin(mut cmd: Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn gridedit");
    child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

const CRIMES: &str = "\
DATE_COMMITTED,STATION,OFFENSE
2016-02-01,B,Other
2015-01-01,A,Property_and_Person
2014-05-05,C,Person_Injury_Only
";

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

#[test]
fn extract_prints_full_dataset_despite_search() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "crimes.csv", CRIMES);

    let output = gridedit(dir.path())
        .args(["extract", &csv, "--search", "2015"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["method"], "Temporary search clear + rendered rows");
    assert_eq!(json["strategy"], "temporary_search_clear");
    assert_eq!(json["headers"], serde_json::json!(["DATE_COMMITTED", "STATION", "OFFENSE"]));

    // Ordered by DATE_COMMITTED, raw values
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], serde_json::json!(["2014-05-05", "C", "Person_Injury_Only"]));
    assert_eq!(rows[2], serde_json::json!(["2016-02-01", "B", "Other"]));
}

#[test]
fn save_of_ragged_csv_reports_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "bad.csv", "STATION,OFFENSE\nA,Other\nB,Other,extra\n");

    let output = run_with_stdin(
        {
            let mut cmd = gridedit(dir.path());
            cmd.args(["edit", &csv, "--server", "http://127.0.0.1:9"]);
            cmd
        },
        "begin\nsave\nquit\n",
    );
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error: Data mismatch: found 2 headers but 3 data columns (row 1)"));
}

#[test]
fn extract_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let output = gridedit(dir.path())
        .args(["extract", "/no/such/file.csv"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn first_run_writes_settings_file() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "crimes.csv", CRIMES);
    gridedit(dir.path()).args(["extract", &csv]).output().unwrap();

    let settings = dir.path().join(".config").join("gridedit").join("settings.json");
    assert!(settings.exists());
}

// ---------------------------------------------------------------------------
// edit
// ---------------------------------------------------------------------------

#[test]
fn edit_session_over_stdin() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "crimes.csv", CRIMES);

    let output = run_with_stdin(
        {
            let mut cmd = gridedit(dir.path());
            cmd.args(["edit", &csv]);
            cmd
        },
        "show\nbegin\nset 1 STATION Z\nundo\nyears\nquit\n",
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 of 3 rows matching \"2015\""));
    assert!(stdout.contains("   1 | 2015-01-01 | A | Property + Person"));
    assert!(stdout.contains("undo: row 1 STATION = \"A\""));
    assert!(stdout.contains("2014  [2015]  2016"));
}

#[test]
fn save_to_unreachable_server_keeps_editing() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "crimes.csv", CRIMES);

    let output = run_with_stdin(
        {
            let mut cmd = gridedit(dir.path());
            cmd.args(["edit", &csv, "--raw", "--no-year-filter", "--server", "http://127.0.0.1:9"]);
            cmd
        },
        "begin\nset 0 OFFENSE Person_Injury_Only\nsave\n",
    );
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error: Error saving table: Network error"));
    assert!(stdout.contains("end of input: unsaved changes discarded"));
}

// ---------------------------------------------------------------------------
// auxiliary actions
// ---------------------------------------------------------------------------

#[test]
fn retrain_against_unreachable_server_exits_12() {
    let dir = TempDir::new().unwrap();
    let output = gridedit(dir.path())
        .args(["retrain", "--server", "http://127.0.0.1:9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(12));
    assert!(String::from_utf8_lossy(&output.stderr).contains("hint:"));
}

#[test]
fn delete_file_declined_does_nothing() {
    let dir = TempDir::new().unwrap();
    let output = run_with_stdin(
        {
            let mut cmd = gridedit(dir.path());
            cmd.args(["delete-file", "crimes_2015", "--server", "http://127.0.0.1:9"]);
            cmd
        },
        "n\n",
    );
    assert!(output.status.success());
}
