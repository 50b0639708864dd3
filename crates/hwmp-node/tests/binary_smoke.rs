//! Smoke tests for the `hwmp-sim` binary.

use std::process::Command;

#[test]
fn sim_discovers_end_of_chain() {
    let bin = env!("CARGO_BIN_EXE_hwmp-sim");

    let output = Command::new(bin)
        .args(["--nodes", "4"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run hwmp-sim");

    assert!(
        output.status.success(),
        "expected exit code 0, got {:?}",
        output.status.code()
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("02:00:00:00:00:01 -> 02:00:00:00:00:04: next hop 02:00:00:00:00:02"),
        "unexpected output: {stdout}"
    );
    assert!(stdout.contains("metric=96 hops=3"), "unexpected output: {stdout}");
}

#[test]
fn sim_rejects_out_of_range_index() {
    let bin = env!("CARGO_BIN_EXE_hwmp-sim");

    let status = Command::new(bin)
        .args(["--nodes", "3", "--to", "7"])
        .env("RUST_LOG", "off")
        .status()
        .expect("failed to run hwmp-sim");

    assert_eq!(status.code(), Some(2));
}

#[test]
fn sim_reports_bad_config() {
    let bin = env!("CARGO_BIN_EXE_hwmp-sim");

    let status = Command::new(bin)
        .args(["--config", "/nonexistent/hwmp.toml"])
        .status()
        .expect("failed to run hwmp-sim");

    assert_eq!(status.code(), Some(1));
}
