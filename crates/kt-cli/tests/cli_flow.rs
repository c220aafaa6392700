//! End-to-end tests driving the `kt` binary.
//!
//! Each test runs with its own `HOME` and `KT_STATS_DIR` so nothing touches the
//! real statistics directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn kt_binary() -> String {
    env!("CARGO_BIN_EXE_kt").to_string()
}

struct Sandbox {
    home: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
        }
    }

    fn stats(&self) -> PathBuf {
        self.home.path().join("stats")
    }

    fn command(&self) -> Command {
        let mut command = Command::new(kt_binary());
        command
            .env("HOME", self.home.path())
            .env("KT_STATS_DIR", self.stats())
            .env_remove("RUST_LOG");
        command
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command().args(args).output().expect("failed to run kt")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "kt {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }
}

fn day_files(stats: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![stats.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.parent().is_some_and(|p| p.ends_with("days")) {
                found.push(path);
            }
        }
    }
    found
}

#[test]
fn test_status_without_data() {
    let sandbox = Sandbox::new();
    let stdout = sandbox.run_ok(&["status"]);
    assert!(stdout.starts_with("No current day recorded"));
}

#[test]
fn test_simulate_then_status_and_report() {
    let sandbox = Sandbox::new();
    let stdout = sandbox.run_ok(&["simulate", "--length", "80", "--seed", "3"]);
    assert!(stdout.starts_with("Replayed "), "unexpected output: {stdout}");

    let status = sandbox.run_ok(&["status", "--json"]);
    let record: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert!(record["totals"]["charsTyped"].as_u64().unwrap() >= 80);
    assert_eq!(record["focusStreaks"].as_array().unwrap().len(), 1);

    assert_eq!(day_files(&sandbox.stats()).len(), 1);

    let report = sandbox.run_ok(&["report"]);
    assert!(report.contains("## Month totals"), "unexpected report: {report}");
    assert!(report.contains("### Alphabet"));

    let json = sandbox.run_ok(&["report", "--json"]);
    let aggregate: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(aggregate["activeDayCount"], 1);
}

#[test]
fn test_watch_reads_stdin_until_eof() {
    let sandbox = Sandbox::new();
    let mut child = sandbox
        .command()
        .arg("watch")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        for key in ["o", "k", " "] {
            writeln!(stdin, r#"{{"phase":"press","key":"{key}"}}"#).unwrap();
            writeln!(stdin, r#"{{"phase":"release","key":"{key}"}}"#).unwrap();
        }
        writeln!(stdin, "garbage").unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert!(
        output.status.success(),
        "watch failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Recorded 3 key actions."), "unexpected output: {stdout}");

    let status = sandbox.run_ok(&["status", "--json"]);
    let record: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(record["totals"]["wordsTyped"], 1);
    assert_eq!(record["keyFrequency"]["o"], 1);
}

#[cfg(unix)]
#[test]
fn test_watch_stops_on_interrupt_with_stdin_open() {
    use std::time::{Duration, Instant};

    let sandbox = Sandbox::new();
    let mut child = sandbox
        .command()
        .arg("watch")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Held open for the whole test, as an upstream key hook would.
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, r#"{{"phase":"release","key":"a"}}"#).unwrap();
    stdin.flush().unwrap();

    // Let the engine start and install its Ctrl-C handler.
    std::thread::sleep(Duration::from_millis(1500));
    let sent = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    while child.try_wait().unwrap().is_none() {
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("watch kept running after SIGINT while stdin was open");
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let output = child.wait_with_output().unwrap();
    assert!(
        output.status.success(),
        "watch failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Recorded 1 key actions."), "unexpected output: {stdout}");
    drop(stdin);

    let status = sandbox.run_ok(&["status", "--json"]);
    let record: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(record["keyFrequency"]["a"], 1);
}

#[test]
fn test_end_streak_refuses_while_watching() {
    let sandbox = Sandbox::new();
    let mut watch = sandbox
        .command()
        .arg("watch")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = watch.stdin.take().unwrap();
    writeln!(stdin, r#"{{"phase":"release","key":"a"}}"#).unwrap();
    stdin.flush().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(1500));

    let output = sandbox.run(&["end-streak"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("another keytally process"), "unexpected error: {stderr}");

    drop(stdin);
    let output = watch.wait_with_output().unwrap();
    assert!(output.status.success());

    // The watched day kept its open streak.
    let status = sandbox.run_ok(&["status", "--json"]);
    let record: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(record["focusStreaks"].as_array().unwrap().len(), 0);
    assert_eq!(record["keyFrequency"]["a"], 1);
}

#[test]
fn test_wipe_requires_exact_phrase() {
    let sandbox = Sandbox::new();
    sandbox.run_ok(&["simulate", "--length", "20"]);
    let before = day_files(&sandbox.stats());
    assert_eq!(before.len(), 1);

    let output = sandbox.run(&["wipe", "--confirm", "yes"]);
    assert!(!output.status.success());
    assert_eq!(day_files(&sandbox.stats()), before);

    let stdout = sandbox.run_ok(&["wipe", "--confirm", "DELETE"]);
    assert!(stdout.starts_with("Deleted all statistics"));
    assert!(day_files(&sandbox.stats()).is_empty());

    let status = sandbox.run_ok(&["status"]);
    assert!(status.contains("Characters: 0"));
    assert!(status.contains("A new day starts with the next session."));
}

#[test]
fn test_rollup_and_purge_vim() {
    let sandbox = Sandbox::new();
    assert_eq!(sandbox.run_ok(&["rollup"]), "No day records to roll up.\n");
    assert_eq!(sandbox.run_ok(&["purge-vim"]), "No current day recorded.\n");

    sandbox.run_ok(&["end-streak"]);
    let rollup = sandbox.run_ok(&["rollup"]);
    assert!(rollup.ends_with("Rolled up 2 summaries.\n"), "unexpected output: {rollup}");
    assert_eq!(sandbox.run_ok(&["purge-vim"]), "No vim shortcuts recorded today.\n");
}

#[test]
fn test_report_rejects_bad_month() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["report", "--month", "2025-13"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("month must be between"));
}
