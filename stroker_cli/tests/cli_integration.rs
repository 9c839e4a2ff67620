use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::net::UdpSocket;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

const STROKE: &str = r#"{"version":"1.0","inverted":false,"range":100,
  "actions":[{"at":0,"pos":0},{"at":500,"pos":100},{"at":1000,"pos":0}]}"#;
const TWIST: &str = r#"{"actions":[{"at":0,"pos":50},{"at":800,"pos":90}]}"#;

/// A media file with stroke and twist scripts next to it.
fn media_dir() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let media = dir.path().join("scene.mp4");
    fs::write(&media, b"").unwrap();
    fs::write(dir.path().join("scene.funscript"), STROKE).unwrap();
    fs::write(dir.path().join("scene.twist.funscript"), TWIST).unwrap();
    (dir, media)
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("stroker.toml");
    fs::write(&path, body).unwrap();
    path
}

fn stroker() -> Command {
    let mut cmd = Command::cargo_bin("stroker").unwrap();
    cmd.arg("--log-level").arg("error");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["--sim", "self-check"], 0, "OK: sim transport", "stdout")]
#[case(&["test"], 2, "required", "stderr")]
#[case(&["--sim", "test", "--axis", "yaw"], 1, "Invalid axis setting", "stderr")]
#[case(&["inspect", "/nonexistent/x.funscript"], 4, "Could not read", "stderr")]
#[case(&["--sim", "play", "--media", "/nonexistent/x.mp4"], 1, "no scripts found", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let mut cmd = stroker();
    cmd.args(args);
    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        _ => unreachable!(),
    }
}

#[test]
fn match_lists_companion_scripts() {
    let (_dir, media) = media_dir();
    stroker()
        .arg("match")
        .arg(&media)
        .assert()
        .success()
        .stdout(predicate::str::contains("scene.funscript"))
        .stdout(predicate::str::contains("twist"))
        .stdout(predicate::str::contains("roll").not());
}

#[test]
fn inspect_summarizes_tracks() {
    let (dir, _media) = media_dir();
    stroker()
        .arg("inspect")
        .arg(dir.path().join("scene.funscript"))
        .assert()
        .success()
        .stdout(predicate::str::contains("3 keyframes"))
        .stdout(predicate::str::contains("0..1000 ms"));
}

#[test]
fn inspect_rejects_garbage() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("bad.funscript");
    fs::write(&script, b"{ not json").unwrap();
    stroker()
        .arg("inspect")
        .arg(&script)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("could not be parsed"));
}

#[test]
fn inverted_range_is_a_config_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        dir.path(),
        r#"
version = 1
[transport]
kind = "sim"
[axes.stroke]
min = 80
max = 20
"#,
    );
    stroker()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"));
}

#[test]
fn sim_playback_sends_lines() {
    let (_dir, media) = media_dir();
    stroker()
        .args(["--sim", "play", "--seconds", "0.3", "--media"])
        .arg(&media)
        .assert()
        .success()
        .stdout(predicate::str::contains("Played stroke,twist"))
        .stdout(predicate::str::contains("Lines sent:"));
}

#[test]
fn udp_playback_reaches_the_socket() {
    let (dir, media) = media_dir();
    let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
    rx.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let cfg = write_config(
        dir.path(),
        &format!(
            r#"
version = 1
[output]
rate_hz = 50
[transport]
kind = "udp"
address = "{}"
bind = "127.0.0.1:0"
"#,
            rx.local_addr().unwrap()
        ),
    );

    stroker()
        .arg("--config")
        .arg(&cfg)
        .args(["play", "--seconds", "0.2", "--media"])
        .arg(&media)
        .assert()
        .success();

    let mut buf = [0u8; 128];
    let n = rx.recv(&mut buf).unwrap();
    let line = std::str::from_utf8(&buf[..n]).unwrap();
    // First tick after connect writes every enabled axis at 50 Hz.
    assert!(line.starts_with("L0"), "unexpected line {line:?}");
    assert!(line.contains("I20"), "unexpected interval in {line:?}");
    assert!(line.ends_with('\n'));
}

#[test]
fn disabled_axis_cannot_be_tested() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        dir.path(),
        r#"
version = 1
[transport]
kind = "sim"
[axes.pitch]
enabled = false
"#,
    );
    stroker()
        .arg("--config")
        .arg(&cfg)
        .args(["test", "--axis", "pitch"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("disabled"));
}
