use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn devsync(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("devsync").unwrap();
    cmd.env("DEVSYNC_HOME", home.path())
        .env_remove("DEVSYNC_PASSWORD")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_status_on_empty_home() {
    let home = TempDir::new().unwrap();

    devsync(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Disconnected"))
        .stdout(predicate::str::contains("Pending:    0"));
}

#[test]
fn test_enqueue_then_list() {
    let home = TempDir::new().unwrap();

    devsync(&home)
        .args(["enqueue", "--payload", r#"{"cmd":"reboot"}"#])
        .assert()
        .success();
    devsync(&home).arg("enqueue").assert().success();

    let listed = json_output(devsync(&home).args(["list", "-o", "json"]));
    assert_eq!(listed["count"], 2);
    assert_eq!(listed["items"][0]["payload"]["cmd"], "reboot");
    assert_eq!(listed["items"][0]["status"], "pending");
}

#[test]
fn test_enqueue_rejects_bad_json() {
    let home = TempDir::new().unwrap();

    devsync(&home)
        .args(["enqueue", "--payload", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_sync_delivers_backlog() {
    let home = TempDir::new().unwrap();
    for n in 0..3 {
        let payload = format!(r#"{{"n":{n}}}"#);
        devsync(&home)
            .args(["enqueue", "--payload", payload.as_str()])
            .assert()
            .success();
    }

    let report = json_output(devsync(&home).args([
        "sync",
        "--address",
        "127.0.0.1",
        "--username",
        "admin",
        "--password",
        "secret",
        "--output",
        "json",
    ]));
    assert_eq!(report["trigger"], "manual");
    assert_eq!(report["outcome"]["kind"], "drained");
    assert_eq!(report["outcome"]["succeeded"], 3);

    let status = json_output(devsync(&home).args(["status", "-o", "json"]));
    assert_eq!(status["queue"]["pending"], 0);
    assert_eq!(status["queue"]["completed"], 3);
}

#[test]
fn test_sync_without_credentials_queues_placeholder() {
    let home = TempDir::new().unwrap();

    devsync(&home)
        .args(["sync", "--address", "127.0.0.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("authentication failed"));

    let listed = json_output(devsync(&home).args(["list", "--status", "pending", "-o", "json"]));
    assert_eq!(listed["count"], 1);
    assert!(listed["items"][0].get("payload").is_none());
}

#[test]
fn test_json_backend_from_config() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("config.yaml"), "storage:\n  backend: json\n").unwrap();

    devsync(&home).arg("enqueue").assert().success();

    assert!(home.path().join("queue.json").exists());
    assert!(!home.path().join("devsync.db").exists());
}

#[test]
fn test_malformed_config_is_an_error() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("config.yaml"), "sync: [unclosed").unwrap();

    devsync(&home)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config error"));
}

#[test]
fn test_prune_keeps_pending_tasks() {
    let home = TempDir::new().unwrap();
    devsync(&home).arg("enqueue").assert().success();

    let pruned = json_output(devsync(&home).args(["prune", "--older-than-days", "0", "-o", "json"]));
    assert_eq!(pruned["removed"], 0);

    let status = json_output(devsync(&home).args(["status", "-o", "json"]));
    assert_eq!(status["queue"]["pending"], 1);
}

#[test]
fn test_prune_accepts_huge_day_count() {
    let home = TempDir::new().unwrap();
    devsync(&home).arg("enqueue").assert().success();

    let pruned = json_output(devsync(&home).args([
        "prune",
        "--older-than-days",
        "4294967295",
        "-o",
        "json",
    ]));
    assert_eq!(pruned["removed"], 0);
}

#[test]
fn test_commands_write_daily_log_file() {
    let home = TempDir::new().unwrap();
    devsync(&home).arg("enqueue").assert().success();

    let logs: Vec<_> = std::fs::read_dir(home.path().join("logs"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(logs.len(), 1);
    let name = logs[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("devsync.") && name.ends_with(".log"), "{name}");
    assert!(std::fs::read_to_string(&logs[0]).unwrap().contains("Queued task"));
}

#[test]
fn test_enqueue_null_payload_is_heartbeat() {
    let home = TempDir::new().unwrap();
    devsync(&home)
        .args(["enqueue", "--payload", "null"])
        .assert()
        .success();

    let listed = json_output(devsync(&home).args(["list", "-o", "json"]));
    assert_eq!(listed["count"], 1);
    assert!(listed["items"][0].get("payload").is_none());
}
