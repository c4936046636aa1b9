use std::io::Read as _;
use std::process::{self, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn lc3vm() -> Command {
    Command::cargo_bin("lc3vm").unwrap()
}

#[test]
fn runs_hello_world() {
    let mut cmd = lc3vm();
    cmd.arg("tests/files/hello.obj").arg("--minimal");

    cmd.assert()
        .success()
        .stdout("Hello, world!\nHALT\n")
        .stderr("");
}

#[test]
fn halts_immediately() {
    let mut cmd = lc3vm();
    cmd.arg("tests/files/halt.obj").arg("--minimal");

    cmd.assert().code(0).stdout("HALT\n");
}

#[test]
fn reports_status_unless_minimal() {
    let mut cmd = lc3vm();
    cmd.arg("tests/files/halt.obj");

    cmd.assert()
        .success()
        .stdout("HALT\n")
        .stderr(contains("Running").and(contains("Halted")));
}

#[test]
fn missing_arguments_is_usage_error() {
    let mut cmd = lc3vm();
    cmd.assert().code(2).stdout("");
}

#[test]
fn unreadable_image_fails_to_load() {
    let mut cmd = lc3vm();
    cmd.arg("tests/files/halt.obj")
        .arg("tests/files/does_not_exist.obj")
        .arg("tests/files/unaligned.obj");

    cmd.assert()
        .code(1)
        .stdout("")
        .stderr(contains("does_not_exist.obj").and(contains("unaligned.obj")));
}

#[test]
fn empty_image_fails_to_load() {
    let mut cmd = lc3vm();
    cmd.arg("tests/files/empty.obj");

    cmd.assert().code(1).stderr(contains("no origin word"));
}

#[test]
fn loads_images_in_order() {
    let mut cmd = lc3vm();
    cmd.arg("tests/files/print_data.obj")
        .arg("tests/files/data.obj")
        .arg("--minimal");

    cmd.assert().success().stdout("from data\nHALT\n");
}

#[test]
fn reads_piped_input() {
    let mut cmd = lc3vm();
    cmd.arg("tests/files/echo.obj").arg("--minimal").write_stdin("ok");

    cmd.assert().success().stdout("ok\nHALT\n");
}

#[test]
fn closed_input_is_an_error() {
    let mut cmd = lc3vm();
    cmd.arg("tests/files/echo.obj").arg("--minimal").write_stdin("o");

    cmd.assert()
        .code(1)
        .stdout("o")
        .stderr(contains("Input closed"));
}

#[test]
fn reserved_opcode_aborts() {
    for image in ["tests/files/res.obj", "tests/files/rti.obj"] {
        let mut cmd = lc3vm();
        cmd.arg(image).arg("--minimal");

        cmd.assert()
            .failure()
            .stdout("")
            .stderr(contains("reserved instruction"));
    }
}

#[test]
fn unknown_trap_depends_on_features() {
    let mut cmd = lc3vm();
    cmd.arg("tests/files/unknown_trap.obj").arg("--minimal");
    cmd.assert().success().stdout("HALT\n");

    let mut cmd = lc3vm();
    cmd.arg("tests/files/unknown_trap.obj")
        .arg("--minimal")
        .arg("--features")
        .arg("strict-traps");
    cmd.assert()
        .code(1)
        .stdout("")
        .stderr(contains("unknown vector"));
}

#[test]
fn rejects_unknown_feature() {
    let mut cmd = lc3vm();
    cmd.arg("tests/files/halt.obj").arg("--features").arg("turbo");

    cmd.assert().code(2).stderr(contains("Unknown feature 'turbo'"));
}

#[test]
fn polling_idle_pipe_times_out() {
    // LDI R0, #1 ; HALT ; .FILL xFE00
    let mut child = process::Command::new(assert_cmd::cargo::cargo_bin("lc3vm"))
        .args(["tests/files/poll.obj", "--minimal", "--poll-timeout", "100"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    // Held open and never written
    let _stdin = child.stdin.take();

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if start.elapsed() > Duration::from_secs(5) {
            child.kill().unwrap();
            panic!("still waiting on keyboard status after 5s");
        }
        sleep(Duration::from_millis(20));
    };
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(status.code(), Some(0));

    let mut stdout = String::new();
    child
        .stdout
        .take()
        .unwrap()
        .read_to_string(&mut stdout)
        .unwrap();
    assert_eq!(stdout, "HALT\n");
}
