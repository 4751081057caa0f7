// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervised execution of a shell command.

use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use kk_core::TIMEOUT_RETCODE;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::time::Instant;

use crate::decode::{LineBuffer, OutputDecoder};
use crate::error::ExecError;
use crate::options::ExecOptions;

const POLL: Duration = Duration::from_millis(10);
const CHUNK: usize = 2048;
/// Upper bound on chunks drained per poll, so supervision stays responsive.
const CHUNKS_PER_POLL: usize = 64;
const HEARTBEAT: Duration = Duration::from_secs(60);
const KILL_WAIT_STEP: Duration = Duration::from_millis(100);
const KILL_WAIT: Duration = Duration::from_secs(1);

/// What a finished command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Exit code; [`TIMEOUT_RETCODE`] on timeout, negated signal when killed.
    pub retcode: i32,
    /// Full decoded output, stdout and stderr interleaved.
    pub output: String,
    pub timed_out: bool,
    /// Stopped by the callback or the cancel token.
    pub stopped: bool,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.retcode == 0
    }
}

/// Run `cmd` with no output handler or callback.
pub async fn run(cmd: &str, opts: &ExecOptions) -> Result<ExecOutcome, ExecError> {
    run_with(cmd, opts, None, None).await
}

/// Run `cmd` through `sh -c`.
///
/// `output` receives each complete line (unmasked, newline included) as soon
/// as it is read. `callback(true)` is polled on the first tick and then every
/// `cb_period` while the child is alive; returning true stops the command.
/// `callback(false)` is called once after the child is gone.
pub async fn run_with(
    cmd: &str,
    opts: &ExecOptions,
    mut output: Option<&mut (dyn FnMut(&str) + Send)>,
    mut callback: Option<&mut (dyn FnMut(bool) -> bool + Send)>,
) -> Result<ExecOutcome, ExecError> {
    let shown = opts.masked(cmd).into_owned();
    if opts.tracing {
        tracing::info!(cmd = %shown, cwd = ?opts.cwd, timeout_secs = opts.timeout.as_secs(), "exec");
    }

    let spool = tempfile::Builder::new().prefix("kk-exec-").suffix(".out").tempfile()?;
    let stdout = spool.reopen()?;
    let stderr = stdout.try_clone()?;

    let mut command = tokio::process::Command::new("sh");
    command
        .arg("-c")
        .arg(cmd)
        .envs(&opts.env)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .process_group(0)
        .kill_on_drop(true);
    if let Some(cwd) = &opts.cwd {
        command.current_dir(cwd);
    }
    let mut child =
        command.spawn().map_err(|source| ExecError::Spawn { cmd: shown.clone(), source })?;
    let pid = child.id();

    let mut reader = tokio::fs::File::open(spool.path()).await?;
    let mut pump = Pump::new(opts);
    let started = Instant::now();
    let deadline = started + opts.timeout;
    let mut next_callback = started;
    let mut next_heartbeat = started + HEARTBEAT;
    let mut timed_out = false;
    let mut stopped = false;

    let status = loop {
        pump.drain(&mut reader, &mut output).await?;

        if let Some(status) = child.try_wait()? {
            break Some(status);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::info!(cmd = %shown, timeout_secs = opts.timeout.as_secs(), "command timed out");
            timed_out = true;
            break terminate(&mut child, pid, opts.kill_grace).await;
        }

        if opts.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            tracing::info!(cmd = %shown, "command cancelled");
            stopped = true;
            break terminate(&mut child, pid, opts.kill_grace).await;
        }

        if now >= next_callback {
            next_callback = now + opts.cb_period;
            if let Some(cb) = callback.as_deref_mut() {
                if cb(true) {
                    tracing::info!(cmd = %shown, "callback requested stop");
                    stopped = true;
                    break terminate(&mut child, pid, opts.kill_grace).await;
                }
            }
        }

        if opts.tracing && now >= next_heartbeat {
            next_heartbeat = now + HEARTBEAT;
            let left = deadline.saturating_duration_since(now);
            tracing::info!(pid, "{:.2}secs to terminate", left.as_secs_f64());
        }

        tokio::time::sleep(POLL).await;
    };

    // Whatever the child wrote right before exiting.
    pump.drain_all(&mut reader, &mut output).await?;
    pump.finish(&mut output);

    if let Some(cb) = callback.as_deref_mut() {
        cb(false);
    }

    let retcode = if timed_out {
        TIMEOUT_RETCODE
    } else {
        status.map(exit_code).unwrap_or(-1)
    };
    if opts.tracing {
        tracing::info!(
            cmd = %shown,
            retcode,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "exec finished"
        );
    }

    let outcome = ExecOutcome { retcode, output: pump.text, timed_out, stopped };
    if opts.raise_on_error && retcode != 0 {
        return Err(ExecError::Failed {
            cmd: shown,
            retcode,
            output: opts.masked(&outcome.output).into_owned(),
        });
    }
    Ok(outcome)
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().or_else(|| status.signal().map(|s| -s)).unwrap_or(-1)
}

/// SIGTERM the process group, wait up to `grace`, then SIGKILL it.
async fn terminate(child: &mut Child, pid: Option<u32>, grace: Duration) -> Option<ExitStatus> {
    for (signal, wait) in [(Signal::SIGTERM, grace), (Signal::SIGKILL, KILL_WAIT)] {
        if let Some(pid) = pid {
            if let Err(e) = killpg(Pid::from_raw(pid as i32), signal) {
                tracing::debug!(pid, signal = ?signal, error = %e, "killpg failed");
            }
        }
        let until = Instant::now() + wait;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) if Instant::now() < until => tokio::time::sleep(KILL_WAIT_STEP).await,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(pid, error = %e, "wait failed");
                    return None;
                }
            }
        }
    }
    tracing::error!(pid, "cannot kill process");
    None
}

/// Moves bytes from the spool through decoding, line assembly and tracing.
struct Pump<'o> {
    opts: &'o ExecOptions,
    decoder: OutputDecoder,
    lines: LineBuffer,
    buf: Vec<u8>,
    text: String,
}

impl<'o> Pump<'o> {
    fn new(opts: &'o ExecOptions) -> Self {
        Self {
            opts,
            decoder: OutputDecoder::new(),
            lines: LineBuffer::new(),
            buf: vec![0; CHUNK],
            text: String::new(),
        }
    }

    async fn drain(
        &mut self,
        reader: &mut tokio::fs::File,
        output: &mut Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> std::io::Result<bool> {
        for _ in 0..CHUNKS_PER_POLL {
            let n = reader.read(&mut self.buf).await?;
            if n == 0 {
                return Ok(true);
            }
            let text = self.decoder.decode(&self.buf[..n]);
            self.feed(&text, output);
        }
        Ok(false)
    }

    async fn drain_all(
        &mut self,
        reader: &mut tokio::fs::File,
        output: &mut Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> std::io::Result<()> {
        while !self.drain(reader, output).await? {}
        Ok(())
    }

    fn finish(&mut self, output: &mut Option<&mut (dyn FnMut(&str) + Send)>) {
        let tail = self.decoder.finish();
        self.feed(&tail, output);
        if let Some(rest) = self.lines.finish() {
            self.emit(&rest, output);
        }
    }

    fn feed(&mut self, text: &str, output: &mut Option<&mut (dyn FnMut(&str) + Send)>) {
        if text.is_empty() {
            return;
        }
        self.text.push_str(text);
        for line in self.lines.push(text) {
            self.emit(&line, output);
        }
    }

    fn emit(&self, line: &str, output: &mut Option<&mut (dyn FnMut(&str) + Send)>) {
        if let Some(out) = output.as_deref_mut() {
            out(line);
        }
        if self.opts.tracing {
            let masked = self.opts.masked(line);
            tracing::info!("{}{}", self.opts.out_prefix, masked.trim_end_matches(['\r', '\n']));
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
