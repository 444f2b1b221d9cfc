//! CLI command integration tests.
//! Each test uses a temp directory via UQ_DATA_DIR for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// base64(SHA-256("correct horseexample.com"))
const CORRECT_HORSE: &str = "CW4tAm3VScOlzZaejYeXBUegvm3JAIGj9LXfvJEtkg4=";

fn uq_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("uq").unwrap();
    cmd.env("UQ_DATA_DIR", data_dir.path());
    cmd.env_remove("UQ_URL");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn derive_reference_output() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .args(["derive", "--secret", "correct horse", "--subject", "example.com"])
        .args(["--limit", "10"])
        .assert()
        .success()
        .stdout("CW4tAm3VSc\n");
}

#[test]
fn derive_default_limit_is_full_length() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .args(["derive", "--secret", "correct horse", "--subject", "example.com"])
        .assert()
        .success()
        .stdout(format!("{CORRECT_HORSE}\n"));
}

#[test]
fn derive_with_exclusions() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .args(["derive", "--secret", "hunter2", "--subject", "github.com"])
        .args(["--exclude", "un"])
        .assert()
        .success()
        .stdout("cuq++s/fokpyshi/fgpeu=\n");
}

#[test]
fn derive_without_subject_prints_hint() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .args(["derive", "--secret", "correct horse"])
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("nothing derived"));
}

#[test]
fn derive_json_reports_url_and_focus() {
    let dir = TempDir::new().unwrap();
    let output = uq_cmd(&dir)
        .args(["derive", "--json", "--secret", "correct horse"])
        .args(["--subject", "example.com", "--limit", "10", "--exclude", "s"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["password"], "CW4tAm3VSc");
    assert_eq!(json["focus"], "secret");
    assert_eq!(
        json["url"],
        "uniqpass:///?limit=10&subject=example.com&ex=s"
    );
}

#[test]
fn url_parameters_seed_inputs() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .args(["--url", "https://uniqpass.local/?subject=github.com&limit=12&ex=s"])
        .args(["derive", "--secret", "hunter2"])
        .assert()
        .success()
        .stdout("c6HuqVKDVsUf\n");
}

#[test]
fn malformed_limit_parameter_is_ignored() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .env("UQ_URL", "https://uniqpass.local/?subject=example.com&limit=abc")
        .args(["derive", "--secret", "correct horse"])
        .assert()
        .success()
        .stdout(format!("{CORRECT_HORSE}\n"))
        .stderr(predicate::str::contains("parameter ignored"));
}

#[test]
fn remember_then_forget() {
    let dir = TempDir::new().unwrap();

    uq_cmd(&dir)
        .args(["derive", "--secret", "correct horse", "--remember"])
        .assert()
        .success();

    // Stored secret is picked up without --secret
    uq_cmd(&dir)
        .args(["derive", "--subject", "example.com", "--limit", "10"])
        .assert()
        .success()
        .stdout("CW4tAm3VSc\n");

    uq_cmd(&dir)
        .arg("forget")
        .assert()
        .success()
        .stdout(predicate::str::contains("forgot stored secret"));

    uq_cmd(&dir)
        .args(["derive", "--subject", "example.com"])
        .assert()
        .success()
        .stderr(predicate::str::contains("nothing derived"));

    uq_cmd(&dir)
        .arg("forget")
        .assert()
        .success()
        .stdout(predicate::str::contains("no stored secret"));
}

#[test]
fn derive_forget_flag_drops_stored_secret() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .args(["derive", "--secret", "correct horse", "--remember"])
        .assert()
        .success();

    uq_cmd(&dir)
        .args(["derive", "--forget", "--subject", "example.com", "--limit", "4"])
        .assert()
        .success()
        .stdout("CW4t\n");

    uq_cmd(&dir)
        .arg("forget")
        .assert()
        .success()
        .stdout(predicate::str::contains("no stored secret"));
}

#[test]
fn copy_emits_osc52_sequence() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .args(["derive", "--copy", "--secret", "correct horse"])
        .args(["--subject", "example.com", "--limit", "10"])
        .assert()
        .success()
        .stderr(predicate::str::contains("\x1b]52;c;Q1c0dEFtM1ZTYw==\x07"));
}

#[test]
fn shell_session_from_stdin() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .arg("shell")
        .write_stdin(
            "secret correct horse\n\
             subject example.com\n\
             limit 10\n\
             reset-limit\n\
             url\n\
             quit\n",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("focus: secret"))
        .stdout(predicate::str::contains("password: CW4tAm3VSc\n"))
        .stdout(predicate::str::contains(format!("password: {CORRECT_HORSE}\n")))
        .stdout(predicate::str::contains(
            "url: uniqpass:///?limit=44&subject=example.com",
        ));
}

#[test]
fn shell_reports_unknown_commands() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .arg("shell")
        .write_stdin("frobnicate\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown command"));
}

#[test]
fn forget_verbose_lists_remaining_keys() {
    let dir = TempDir::new().unwrap();
    uq_cmd(&dir)
        .args(["derive", "--secret", "correct horse", "--remember"])
        .assert()
        .success();

    uq_cmd(&dir)
        .args(["--verbose", "forget"])
        .assert()
        .success()
        .stdout(predicate::str::contains("forgot stored secret"))
        .stderr(predicate::str::contains("store keys after forget"))
        .stderr(predicate::str::contains("remaining=[]"));
}
