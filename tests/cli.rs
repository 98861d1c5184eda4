use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `sal` invocation isolated from the host environment: config pinned to a
/// file inside `dir`, credentials and overrides scrubbed, cwd moved into the
/// temp dir so no local `.sal/` is picked up.
fn sal(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sal").unwrap();
    cmd.current_dir(dir.path())
        .env("SAL_CONFIG", dir.path().join("config.json"))
        .env_remove("SAL_ACCESS_TOKEN")
        .env_remove("SAL_CUSTOMER_ID")
        .env_remove("SAL_API_URL")
        .env_remove("SAL_ENV_FILE")
        .env_remove("XDG_CONFIG_HOME");
    cmd
}

#[test]
fn help_smoke() {
    let dir = TempDir::new().unwrap();
    sal(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("custom-labeling"));
}

#[test]
fn version_flag() {
    let dir = TempDir::new().unwrap();
    sal(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sal"));
}

#[test]
fn config_set_get_list_round_trip() {
    let dir = TempDir::new().unwrap();

    sal(&dir)
        .args(["config", "set", "customer_id", "123-456-7890"])
        .assert()
        .success();
    sal(&dir)
        .args(["config", "set", "condition", "Greater than or equal to"])
        .assert()
        .success();

    sal(&dir)
        .args(["config", "get", "customer_id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("123-456-7890"));

    sal(&dir)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("customer_id = 123-456-7890"))
        .stdout(predicate::str::contains("condition = Greater than or equal to"));

    sal(&dir)
        .args(["config", "unset", "customer_id"])
        .assert()
        .success();
    sal(&dir)
        .args(["config", "get", "customer_id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not set"));
}

#[test]
fn config_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    sal(&dir)
        .args(["config", "set", "bogus", "value"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn report_requires_a_customer_id() {
    let dir = TempDir::new().unwrap();
    sal(&dir)
        .args(["report", "--token", "t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("customer id is not configured"));
}

#[test]
fn report_requires_an_access_token() {
    let dir = TempDir::new().unwrap();
    sal(&dir)
        .args(["report", "--customer-id", "1234567890"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("access token"));
}

#[test]
fn report_rejects_inverted_date_ranges_before_fetching() {
    let dir = TempDir::new().unwrap();
    sal(&dir)
        .args([
            "report",
            "--customer-id",
            "1234567890",
            "--token",
            "t",
            // Loopback api-url guards against accidental real requests; the
            // date validation fails before any connection is attempted.
            "--api-url",
            "http://127.0.0.1:1",
            "--start-date",
            "2024-02-01",
            "--end-date",
            "2024-01-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("start date"));
}

#[test]
fn label_rejects_an_unknown_condition_before_fetching() {
    let dir = TempDir::new().unwrap();
    sal(&dir)
        .args([
            "label",
            "--customer-id",
            "1234567890",
            "--token",
            "t",
            "--api-url",
            "http://127.0.0.1:1",
            "--condition",
            "Roughly equal",
            "--control-column",
            "cost_micros",
            "--threshold1",
            "1",
            "--label",
            "X",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Roughly equal"));
}

#[test]
fn label_rejects_an_unknown_control_column() {
    let dir = TempDir::new().unwrap();
    sal(&dir)
        .args([
            "label",
            "--customer-id",
            "1234567890",
            "--token",
            "t",
            "--api-url",
            "http://127.0.0.1:1",
            "--condition",
            "Equal",
            "--control-column",
            "margin",
            "--threshold1",
            "1",
            "--label",
            "X",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown control column"));
}
