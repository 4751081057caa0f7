// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers: binary runners and step-file fixtures.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;

pub fn kktool() -> Run {
    Run::new("kktool")
}

pub fn kkagent() -> Run {
    Run::new("kkagent")
}

pub struct Run {
    cmd: Command,
}

impl Run {
    fn new(bin: &str) -> Self {
        let mut cmd = Command::cargo_bin(bin).unwrap();
        cmd.env_remove("RUST_LOG");
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn arg(mut self, arg: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.arg(arg);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn env_remove(mut self, key: &str) -> Self {
        self.cmd.env_remove(key);
        self
    }

    pub fn passes(mut self) -> Output {
        let out = self.cmd.output().unwrap();
        let output = Output::from(out);
        assert!(output.success, "expected success\nstdout:\n{}\nstderr:\n{}", output.stdout, output.stderr);
        output
    }

    pub fn fails(mut self) -> Output {
        let out = self.cmd.output().unwrap();
        let output = Output::from(out);
        assert!(!output.success, "expected failure\nstdout:\n{}\nstderr:\n{}", output.stdout, output.stderr);
        output
    }
}

pub struct Output {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<std::process::Output> for Output {
    fn from(out: std::process::Output) -> Self {
        Self {
            success: out.status.success(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        }
    }
}

impl Output {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout lacks {needle:?}:\n{}", self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr lacks {needle:?}:\n{}", self.stderr);
        self
    }

    pub fn stderr_lacks(self, needle: &str) -> Self {
        assert!(!self.stderr.contains(needle), "stderr has {needle:?}:\n{}", self.stderr);
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        assert!(!self.stdout.contains(needle), "stdout has {needle:?}:\n{}", self.stdout);
        self
    }

    /// Stdout lines that parse as JSON progress messages.
    pub fn progress(&self) -> Vec<Value> {
        self.stdout.lines().filter_map(|l| serde_json::from_str(l).ok()).collect()
    }

    /// The last progress message, which must be terminal.
    pub fn last_progress(&self) -> Value {
        let all = self.progress();
        let last = all.last().cloned().unwrap_or_else(|| panic!("no progress lines in:\n{}", self.stdout));
        assert_ne!(last["status"], "in-progress", "last message is not terminal: {last}");
        last
    }
}

/// A temp dir holding a step file.
pub struct Workdir {
    dir: tempfile::TempDir,
}

impl Workdir {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn step(&self, step: Value) -> PathBuf {
        let path = self.dir.path().join("step.json");
        std::fs::write(&path, serde_json::to_vec(&step).unwrap()).unwrap();
        path
    }
}
