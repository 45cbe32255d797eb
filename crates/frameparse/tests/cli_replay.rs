#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "frameparse-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn frameparse(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_frameparse"))
        .args(["--log-level", "off"])
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("frameparse should start");
    if let Some(mut pipe) = child.stdin.take() {
        // The child may exit before reading when its arguments are rejected.
        let _ = pipe.write_all(stdin);
    }
    child.wait_with_output().expect("frameparse should finish")
}

fn replay_json(extra: &[&str], hex_input: &str) -> Value {
    let mut args = vec!["--format", "json", "replay", "-", "--hex"];
    args.extend_from_slice(extra);
    let output = frameparse(&args, hex_input.as_bytes());
    assert!(
        output.status.success(),
        "replay failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn garbage_prefixed_frame_parses_once() {
    let report = replay_json(&[], "ff ff aa 01 00 02 10 20");

    let events = report["events"].as_array().expect("events array");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["kind"], "parsed");
    assert_eq!(events[0]["type_id"], "0x01");
    assert_eq!(events[0]["data"], "1020");
    assert_eq!(report["status"]["frames_parsed"], 1);
    assert_eq!(report["status"]["discards"], 0);
}

#[test]
fn byte_at_a_time_matches_whole_capture() {
    let capture = "aa0100021020 aa0200030a0b0c aa01000199";
    for mode in ["inline", "queued"] {
        let whole = replay_json(&["--mode", mode], capture);
        let split = replay_json(&["--mode", mode, "--chunk-size", "1"], capture);
        assert_eq!(whole["events"], split["events"], "mode {mode}");
        assert_eq!(split["status"]["frames_parsed"], 3, "mode {mode}");
    }
}

#[test]
fn unregistered_type_is_reported_and_strict_fails() {
    let report = replay_json(&["--types", "01"], "aa020001ff aa010001ee");
    let kinds: Vec<&str> = report["events"]
        .as_array()
        .expect("events array")
        .iter()
        .filter_map(|e| e["kind"].as_str())
        .collect();
    assert_eq!(kinds, vec!["unknown-type", "discarded"]);

    let output = frameparse(
        &["--format", "json", "replay", "-", "--hex", "--types", "01", "--strict"],
        b"aa020001ff",
    );
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn raw_format_writes_payloads_only() {
    let dir = unique_temp_dir("raw");
    let capture = dir.join("capture.bin");
    std::fs::write(
        &capture,
        [0x00, 0xAA, 0x01, 0x00, 0x02, b'h', b'i', 0xAA, 0x02, 0x00, 0x01, b'!'],
    )
    .expect("capture should be writable");

    let output = frameparse(
        &[
            "--format",
            "raw",
            "replay",
            capture.to_str().expect("utf-8 path"),
            "--chunk-size",
            "5",
        ],
        b"",
    );
    assert!(output.status.success());
    assert_eq!(output.stdout, b"hi!");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn config_file_sets_engine_options() {
    let dir = unique_temp_dir("config");
    let config = dir.join("engine.json");
    std::fs::write(
        &config,
        r#"{"name":"from-file","mode":"inline","sync_marker":"aa","max_retry_attempts":2}"#,
    )
    .expect("config should be writable");

    let report = replay_json(
        &["--config", config.to_str().expect("utf-8 path")],
        "aa0100021020",
    );
    assert_eq!(report["status"]["name"], "from-file");
    assert_eq!(report["status"]["mode"], "inline");
    assert_eq!(report["status"]["max_retry_attempts"], 2);

    let report = replay_json(
        &[
            "--config",
            config.to_str().expect("utf-8 path"),
            "--max-retries",
            "5",
            "--sync",
            "none",
        ],
        "aa0100021020",
    );
    assert_eq!(report["status"]["max_retry_attempts"], 5);
    assert!(report["status"]["sync_marker"].is_null());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn pretty_format_lists_events_and_status() {
    let output = frameparse(&["--format", "pretty", "replay", "-", "--hex"], b"aa0100021020");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("#0 parsed type=0x01 size=2 data=1020"));
    assert!(stdout.contains("Frames parsed: 1"));
}

#[test]
fn sync_marker_must_lead_with_reference_sync_byte() {
    let output = frameparse(&["replay", "-", "--hex", "--sync", "eb90"], b"aa0100021020");
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("0xaa"));

    let report = replay_json(&["--sync", "0xAA"], "00 aa0100021020");
    assert_eq!(report["status"]["sync_marker"], "aa");
    assert_eq!(report["status"]["frames_parsed"], 1);

    let dir = unique_temp_dir("foreign-sync");
    let config = dir.join("engine.json");
    std::fs::write(&config, r#"{"sync_marker":"0xEB90"}"#).expect("config should be writable");
    let output = frameparse(
        &["replay", "-", "--hex", "--config", config.to_str().expect("utf-8 path")],
        b"aa0100021020",
    );
    assert_eq!(output.status.code(), Some(64));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn bad_inputs_map_to_exit_codes() {
    let output = frameparse(&["replay", "-", "--hex"], b"not hex");
    assert_eq!(output.status.code(), Some(60));

    let output = frameparse(&["replay", "/nonexistent/frameparse/capture.bin"], b"");
    assert_eq!(output.status.code(), Some(1));

    let output = frameparse(&["replay", "-", "--sync", "xyz"], b"");
    assert_eq!(output.status.code(), Some(64));

    let dir = unique_temp_dir("bad-config");
    let config = dir.join("engine.json");
    std::fs::write(&config, r#"{"mode":"sideways"}"#).expect("config should be writable");
    let output = frameparse(
        &["replay", "-", "--config", config.to_str().expect("utf-8 path")],
        b"",
    );
    assert_eq!(output.status.code(), Some(60));
    let _ = std::fs::remove_dir_all(dir);
}
