// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No process started by a step outlives the step.

use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::prelude::*;

/// True while `pid` exists and is not a zombie.
fn alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat.rsplit_once(") ").is_some_and(|(_, rest)| !rest.starts_with('Z')),
        Err(_) => false,
    }
}

fn read_pid(path: &Path) -> u32 {
    let started = Instant::now();
    loop {
        if let Some(pid) = std::fs::read_to_string(path).ok().and_then(|s| s.trim().parse().ok()) {
            return pid;
        }
        assert!(started.elapsed() < Duration::from_secs(10), "no pid written to {}", path.display());
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn gone_within(pid: u32, limit: Duration) -> bool {
    let started = Instant::now();
    while started.elapsed() < limit {
        if !alive(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    !alive(pid)
}

/// Shell command that backgrounds a sleeper, records its pid and waits.
fn sleeper_cmd(pid_file: &Path) -> String {
    format!("sleep 30 & echo $! > '{}'; wait", pid_file.display())
}

#[test]
fn timed_out_command_leaves_nothing_running() {
    let work = Workdir::new();
    let pid_file = work.path().join("sleeper.pid");
    let step = work.step(json!({"tool": "shell", "cmd": sleeper_cmd(&pid_file), "timeout": 1}));

    let out = kktool().arg("-s").arg(&step).args(&["run"]).passes();
    assert_eq!(out.last_progress()["retcode"], 10000);

    let sleeper = read_pid(&pid_file);
    assert!(gone_within(sleeper, Duration::from_secs(2)), "sleeper {sleeper} still running");
}

#[test]
fn terminated_harness_stops_its_command() {
    let work = Workdir::new();
    let pid_file = work.path().join("sleeper.pid");
    let step = work.step(json!({"tool": "shell", "cmd": sleeper_cmd(&pid_file), "timeout": 60}));

    // Same shape as the agent's kill: SIGTERM to the harness's process group.
    let mut harness = std::process::Command::new(assert_cmd::cargo::cargo_bin("kktool"))
        .arg("-s")
        .arg(&step)
        .arg("run")
        .process_group(0)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let sleeper = read_pid(&pid_file);
    assert!(alive(sleeper));

    let group = format!("-{}", harness.id());
    let killed = std::process::Command::new("kill").args(["-TERM", "--", &group]).status().unwrap();
    assert!(killed.success());

    let started = Instant::now();
    while harness.try_wait().unwrap().is_none() {
        assert!(started.elapsed() < Duration::from_secs(5), "harness ignored SIGTERM");
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(gone_within(sleeper, Duration::from_secs(2)), "sleeper {sleeper} still running");
}
