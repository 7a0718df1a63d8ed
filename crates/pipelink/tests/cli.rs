#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/pipelink-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn pipelink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pipelink"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn spawn_server(dir: &Path, name: &str, extra: &[&str]) -> Child {
    pipelink()
        .arg("--format")
        .arg("raw")
        .arg("serve")
        .arg(name)
        .arg("--runtime-dir")
        .arg(dir)
        .arg("--info-file")
        .arg(dir.join(format!("{name}.json")))
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve command should start")
}

fn wait_for_file(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("{} did not appear", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn send(dir: &Path, name: &str, messages: &[&str]) -> Output {
    let mut cmd = pipelink();
    cmd.arg("send").arg(name).arg("--runtime-dir").arg(dir);
    for message in messages {
        cmd.arg("-m").arg(message);
    }
    cmd.output().expect("send should run")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn version_prints_package_version() {
    let output = pipelink().arg("version").output().expect("version should run");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("pipelink {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn one_time_serve_receives_sent_messages() {
    let dir = unique_temp_dir("roundtrip");
    let info = dir.join("roundtrip.json");
    let server = spawn_server(&dir, "roundtrip", &["--timeout", "5s"]);
    wait_for_file(&info, Duration::from_secs(5));

    let record: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&info).expect("info file readable"))
            .expect("info file should be json");
    assert_eq!(record["channel"], "roundtrip");
    assert_eq!(record["policy"], "one-time");
    assert_eq!(record["pid"].as_u64(), Some(u64::from(server.id())));

    let sent = send(&dir, "roundtrip", &["hello", "second message"]);
    assert!(sent.status.success(), "send failed: {sent:?}");

    let output = server.wait_with_output().expect("server should exit");
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    let hello = lines.iter().position(|l| l == "hello").expect("hello printed");
    assert_eq!(lines[hello + 1], "second message");
    assert!(lines.iter().any(|l| l == "Pipeline server 'roundtrip' closed"));
    assert!(!info.exists(), "info file removed on clean exit");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_reads_stdin_lines_when_no_message_given() {
    let dir = unique_temp_dir("stdin");
    let server = spawn_server(&dir, "stdin", &[]);
    wait_for_file(&dir.join("stdin.json"), Duration::from_secs(5));

    let mut sender = pipelink()
        .arg("send")
        .arg("stdin")
        .env("PIPELINK_RUNTIME_DIR", &dir)
        .stdin(Stdio::piped())
        .spawn()
        .expect("send should start");
    sender
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(b"from stdin\nanother\n")
        .expect("stdin write should succeed");
    assert!(sender.wait().expect("send should exit").success());

    let output = server.wait_with_output().expect("server should exit");
    let lines = stdout_lines(&output);
    assert!(lines.iter().any(|l| l == "from stdin"));
    assert!(lines.iter().any(|l| l == "another"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn one_time_serve_times_out_cleanly() {
    let dir = unique_temp_dir("idle");
    let output = pipelink()
        .arg("--format")
        .arg("json")
        .arg("serve")
        .arg("idle")
        .arg("--runtime-dir")
        .arg(&dir)
        .arg("--timeout")
        .arg("200ms")
        .output()
        .expect("serve should run");

    assert!(output.status.success());
    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("each line should be json"))
        .collect();
    assert!(lines.iter().all(|l| l["channel"] == "idle"));
    assert!(lines
        .iter()
        .any(|l| l["line"] == "Timeout waiting for client."));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn sustained_serve_stops_after_retry_limit() {
    let dir = unique_temp_dir("sustained");
    let output = pipelink()
        .arg("--format")
        .arg("raw")
        .arg("serve")
        .arg("sustained")
        .arg("--runtime-dir")
        .arg(&dir)
        .args(["--policy", "sustained", "--retry-limit", "2", "--timeout", "100ms"])
        .output()
        .expect("serve should run");

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(
        lines
            .iter()
            .filter(|l| *l == "Timeout waiting for client.")
            .count(),
        2
    );
    assert!(lines
        .iter()
        .any(|l| l == "Retry limit reached, stopping server."));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_without_server_returns_124() {
    let dir = unique_temp_dir("missing");
    let output = pipelink()
        .arg("send")
        .arg("nobody")
        .arg("--runtime-dir")
        .arg(&dir)
        .arg("--timeout")
        .arg("200ms")
        .arg("-m")
        .arg("lost")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(124));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_channel_name_returns_64() {
    let output = pipelink()
        .arg("serve")
        .arg("bad/name")
        .output()
        .expect("serve should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn invalid_timeout_returns_64() {
    let output = pipelink()
        .arg("send")
        .arg("x")
        .arg("--timeout")
        .arg("soon")
        .arg("-m")
        .arg("x")
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn busy_channel_returns_3() {
    let dir = unique_temp_dir("busy");
    let mut first = spawn_server(&dir, "busy", &["--timeout", "infinite"]);
    wait_for_file(&dir.join("busy.json"), Duration::from_secs(5));

    let output = pipelink()
        .arg("serve")
        .arg("busy")
        .arg("--runtime-dir")
        .arg(&dir)
        .output()
        .expect("second serve should run");
    assert_eq!(output.status.code(), Some(3));

    let _ = first.kill();
    let _ = first.wait();
    let _ = std::fs::remove_dir_all(&dir);
}
