//! CLI contract tests.

use std::fs;
use std::path::Path;

use assert_cmd::Command;

const CONFIG: &str = r#"
[registry]
allow_list = ["core-a", "core-b"]
"#;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn experiments() -> Command {
    let mut cmd = Command::cargo_bin("experiments").expect("binary should build");
    cmd.env_remove("EXPERIMENTS_CONFIG_PATH").env_remove("RUST_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command, success: bool) -> String {
    let output = cmd.output().expect("binary should run");
    assert_eq!(output.status.success(), success, "unexpected exit status");
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn check_prints_allow_list_and_policy() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let config = write(tmp.path(), "config.toml", CONFIG);

    let stdout = stdout_of(
        experiments().arg("--config").arg(&config).arg("check"),
        true,
    );
    assert!(stdout.contains("token policy: owner"));
    assert!(stdout.contains("allow list (2 modules)"));
    assert!(stdout.contains("core-b"));
    assert!(stdout.contains("audit trail: disabled"));
}

#[test]
fn check_rejects_invalid_config() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let config = write(tmp.path(), "config.toml", "[registry]\nallow_list = []\n");

    let output = experiments()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .output()
        .expect("binary should run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("allow_list is empty"));
}

#[test]
fn simulate_reports_premature_read_and_writes_audit() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let audit = tmp.path().join("audit.jsonl");
    let config = write(
        tmp.path(),
        "config.toml",
        &format!("{CONFIG}\n[audit]\npath = {:?}\n", audit.display().to_string()),
    );
    let manifest = write(
        tmp.path(),
        "boot.toml",
        r#"
[[module]]
name = "core-a"
publish = { getThing = 42 }
reads = ["core-a", "core-b"]
"#,
    );

    let stdout = stdout_of(
        experiments()
            .arg("--config")
            .arg(&config)
            .arg("simulate")
            .arg(&manifest)
            .arg("--json"),
        true,
    );
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("JSON report");
    assert_eq!(report["modules"][0]["publish"]["keys"][0], "getThing");
    assert_eq!(report["modules"][0]["reads"][0]["status"], "ok");
    assert_eq!(report["modules"][0]["reads"][1]["kind"], "unregistered_module");

    let trail = fs::read_to_string(&audit).expect("audit trail written");
    assert!(trail.contains("module_registered"));
    assert!(trail.contains("access_denied"));
}

#[test]
fn simulate_fails_when_a_module_cannot_register() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let config = write(tmp.path(), "config.toml", CONFIG);
    let manifest = write(
        tmp.path(),
        "boot.toml",
        r#"
[[module]]
name = "third-party"
"#,
    );

    let stdout = stdout_of(
        experiments()
            .arg("--config")
            .arg(&config)
            .arg("simulate")
            .arg(&manifest),
        false,
    );
    assert!(stdout.contains("FAILED not_allowlisted"));
}
