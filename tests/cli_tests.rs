//! CLI integration tests

use std::process::Command;

fn voice_capture_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_voice-capture"))
}

#[test]
fn help_output() {
    let output = voice_capture_bin()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("WAV"));
    assert!(stdout.contains("enroll"));
    assert!(stdout.contains("verify"));
    assert!(stdout.contains("talk"));
    assert!(stdout.contains("convert"));
    assert!(stdout.contains("config"));
    assert!(stdout.contains("--output"));
    assert!(stdout.contains("--json"));
}

#[test]
fn version_output() {
    let output = voice_capture_bin()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("voice-capture"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_subcommand_is_usage_error() {
    let output = voice_capture_bin()
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn config_path_command() {
    let output = voice_capture_bin()
        .args(["config", "path"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("voice-capture"));
    assert!(stdout.contains("config.toml"));
}

#[test]
fn config_help() {
    let output = voice_capture_bin()
        .args(["config", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("init"));
    assert!(stdout.contains("set"));
    assert!(stdout.contains("get"));
    assert!(stdout.contains("list"));
    assert!(stdout.contains("path"));
}

#[test]
fn invalid_min_duration_error() {
    let output = voice_capture_bin()
        .args(["enroll", "--min-duration", "invalid"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid min-duration"),
        "Expected error about invalid duration, got: {}",
        stderr
    );
}

#[test]
fn invalid_max_duration_error() {
    let output = voice_capture_bin()
        .args(["talk", "--max-duration", "forever"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid max-duration"),
        "Expected error about invalid duration, got: {}",
        stderr
    );
}

// Valid recording commands open the microphone and wait for input, so they
// are covered by the controller unit tests instead.
