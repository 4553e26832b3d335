// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for the ise-bootstrap binary

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Settings store pointing both admin slots at a closed local port
const UNREACHABLE_SETTINGS: &str = r#"
[values]
admin_username = "admin"
admin_password = "secret"
primary_ip = "127.0.0.1:1"
primary_fqdn = "pan-1.example.com"
secondary_ip = "127.0.0.1:1"
secondary_fqdn = "pan-2.example.com"
function_url = "http://127.0.0.1:1/api/run"

[[labeled]]
label = "pan_roles"
value = ""

[[labeled]]
label = "pan_roles/secondary"
value = "SecondaryAdmin, SecondaryMonitoring"

[[labeled]]
label = "pan_services"
value = "Session, Profiler"

[[labeled]]
label = "pan_services/secondary"
value = "Session, Profiler"

[[labeled]]
label = "psn_fqdn"
value = "psn-1.example.com"

[[labeled]]
label = "psn_roles"
value = ""

[[labeled]]
label = "psn_services"
value = "Session,Profiler"

[[labeled]]
label = "psn_fqdn"
value = "mnt-1.example.com"

[[labeled]]
label = "psn_roles"
value = "PrimaryDedicatedMonitoring"

[[labeled]]
label = "psn_services"
value = "Session,Profiler"
"#;

fn write_config(dir: &Path, settings: &Path) -> std::path::PathBuf {
    let config_path = dir.join("ise-bootstrap.toml");
    let config_content = format!(
        r#"name = "test"
settings_file = "{}"

[transport]
scheme = "http"
request_timeout_secs = 5
"#,
        settings.display()
    );
    std::fs::write(&config_path, config_content).unwrap();
    config_path
}

fn bin() -> Command {
    Command::cargo_bin("ise-bootstrap").unwrap()
}

/// Test the version command
#[test]
fn test_version_command() {
    let mut cmd = bin();
    cmd.arg("version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ise-bootstrap v"))
        .stdout(predicate::str::contains("Deployment bootstrap controller"));
}

/// Test the help output
#[test]
fn test_help_command() {
    let mut cmd = bin();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Orchestration"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check-settings"));
}

/// Test initializing configuration
#[test]
fn test_init_config() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("new-config.toml");

    let mut cmd = bin();
    cmd.arg("--config").arg(&config_path).arg("init");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    assert!(config_path.exists());
    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("name = \"ise-bootstrap\""));
    assert!(content.contains("settle_delay_secs = 100"));
}

/// Test init refuses to overwrite without force
#[test]
fn test_init_no_overwrite() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("existing.toml");
    std::fs::write(&config_path, "name = \"existing\"").unwrap();

    let mut cmd = bin();
    cmd.arg("--config").arg(&config_path).arg("init");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let mut cmd = bin();
    cmd.arg("--config").arg(&config_path).arg("init").arg("--force");
    cmd.assert().success();

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("name = \"ise-bootstrap\""));
}

/// Test config command with no file
#[test]
fn test_config_defaults() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("nonexistent.toml");

    let mut cmd = bin();
    cmd.arg("--config").arg(&config_path).arg("config");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No configuration file found"))
        .stdout(predicate::str::contains("settle_delay_secs = 100"));
}

/// Test an invalid configuration file is rejected
#[test]
fn test_invalid_config() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("bad.toml");
    std::fs::write(
        &config_path,
        "name = \"test\"\n\n[transport]\nscheme = \"ftp\"\n",
    )
    .unwrap();

    let mut cmd = bin();
    cmd.arg("--config").arg(&config_path).arg("config");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Unsupported transport scheme"));
}

/// Test the settings check lists the cluster
#[test]
fn test_check_settings() {
    let temp_dir = tempdir().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(&settings_path, UNREACHABLE_SETTINGS).unwrap();
    let config_path = write_config(temp_dir.path(), &settings_path);

    let mut cmd = bin();
    cmd.arg("--config").arg(&config_path).arg("check-settings");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Settings are consistent"))
        .stdout(predicate::str::contains("Secondary promotions: 1"))
        .stdout(predicate::str::contains("PSN registrations: 2"))
        .stdout(predicate::str::contains("mnt-1.example.com"))
        .stdout(predicate::str::contains("dedicated monitoring"));
}

/// Test mismatched PSN lists are reported
#[test]
fn test_check_settings_inconsistent() {
    let temp_dir = tempdir().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    let settings = format!(
        "{}\n[[labeled]]\nlabel = \"psn_fqdn\"\nvalue = \"psn-3.example.com\"\n",
        UNREACHABLE_SETTINGS
    );
    std::fs::write(&settings_path, settings).unwrap();
    let config_path = write_config(temp_dir.path(), &settings_path);

    let mut cmd = bin();
    cmd.arg("--config").arg(&config_path).arg("check-settings");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Inconsistent cluster settings"));
}

/// Test a run with a missing settings store fails before contacting nodes
#[test]
fn test_run_missing_settings() {
    let temp_dir = tempdir().unwrap();
    let config_path = write_config(temp_dir.path(), &temp_dir.path().join("missing.toml"));

    let mut cmd = bin();
    cmd.arg("--config").arg(&config_path).arg("run");
    cmd.assert()
        .code(2)
        .stdout(predicate::str::contains("did not start"))
        .stdout(predicate::str::contains("Failed to load settings store"));

    let mut cmd = bin();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("--json")
        .arg("run");
    cmd.assert()
        .code(2)
        .stdout(predicate::str::contains("\"outcome\": \"fatal\""))
        .stdout(predicate::str::contains("Failed to load settings store"));
}

/// Test an unparseable configuration is a fatal run outcome
#[test]
fn test_run_invalid_config_is_fatal() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("bad.toml");
    std::fs::write(&config_path, "name = [").unwrap();

    let mut cmd = bin();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("--json")
        .arg("run");
    cmd.assert()
        .code(2)
        .stdout(predicate::str::contains("\"outcome\": \"fatal\""))
        .stdout(predicate::str::contains("Failed to load config"));
}

/// Test a run against unreachable nodes does nothing and succeeds
#[test]
fn test_run_unreachable_nodes() {
    let temp_dir = tempdir().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(&settings_path, UNREACHABLE_SETTINGS).unwrap();
    let config_path = write_config(temp_dir.path(), &settings_path);

    let mut cmd = bin();
    cmd.arg("--config").arg(&config_path).arg("run");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Primary:   unreachable"))
        .stdout(predicate::str::contains("Mutations succeeded: 0"))
        .stdout(predicate::str::contains("nothing to do"));
}

/// Test the JSON run output carries the outcome tag
#[test]
fn test_run_json_output() {
    let temp_dir = tempdir().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(&settings_path, UNREACHABLE_SETTINGS).unwrap();
    let config_path = write_config(temp_dir.path(), &settings_path);

    let mut cmd = bin();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("--json")
        .arg("run");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\": \"success\""));
}

/// Test the settings flag overrides the configured store
#[test]
fn test_plan_with_settings_override() {
    let temp_dir = tempdir().unwrap();
    let settings_path = temp_dir.path().join("override.toml");
    std::fs::write(&settings_path, UNREACHABLE_SETTINGS).unwrap();
    let config_path = write_config(temp_dir.path(), &temp_dir.path().join("missing.toml"));

    let mut cmd = bin();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("--settings")
        .arg(&settings_path)
        .arg("plan");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("unreachable"))
        .stdout(predicate::str::contains("Plan: nothing to do"));
}

/// Test the trigger does not fire for an unreachable primary
#[test]
fn test_trigger_unreachable_primary() {
    let temp_dir = tempdir().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(&settings_path, UNREACHABLE_SETTINGS).unwrap();
    let config_path = write_config(temp_dir.path(), &settings_path);

    let mut cmd = bin();
    cmd.arg("--config").arg(&config_path).arg("trigger");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Primary is unreachable"));
}
