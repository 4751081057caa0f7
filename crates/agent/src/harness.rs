// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running one tool command for the agent.
//!
//! [`ProcessHarness`] spawns the harness binary (or a package's own entry
//! executable) and reads its progress lines from a loopback socket.
//! [`BuiltinHarness`] runs the compiled-in tools on the agent's runtime.
//! Both return the terminal [`Progress`] and forward streamed batches.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use kk_core::{Command, Context, FailReason, FieldError, ObjectUri, Step, TIMEOUT_RETCODE};
use kk_exec::quote;
use kk_tools::{session, ChannelSink, Registry};
use kk_transfer::{PackageCache, StoreConfig};
use kk_wire::{Batch, Progress};
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::HarnessError;

/// Room for the tool to stop its own commands after SIGTERM; those use a
/// one second grace of their own.
const CHILD_KILL_GRACE: Duration = Duration::from_secs(3);

/// One command of one step.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub step: &'a Step,
    pub command: Command,
    /// Step file the child reads; already written.
    pub step_file: &'a Path,
    pub workdir: &'a Path,
    pub timeout: Duration,
}

impl Invocation<'_> {
    /// Child working directory: the step's `cwd` when it exists, else the workdir.
    pub fn cwd(&self) -> PathBuf {
        match self.step.cwd() {
            Some(cwd) => {
                let path = self.workdir.join(cwd);
                if path.is_dir() {
                    path
                } else {
                    self.workdir.to_path_buf()
                }
            }
            None => self.workdir.to_path_buf(),
        }
    }
}

#[async_trait]
pub trait Harness: Send + Sync {
    /// Run `inv` to its terminal message.
    ///
    /// Timeout and cancellation are not errors: they come back as
    /// `reason=timeout` / `reason=cancelled`. Errors mean the tool broke
    /// the contract or could not be started.
    async fn invoke(
        &self,
        cx: &Context,
        inv: &Invocation<'_>,
        batches: Option<mpsc::Sender<Batch>>,
    ) -> Result<Progress, HarnessError>;
}

fn timed_out(inv: &Invocation<'_>) -> Progress {
    Progress::Error {
        reason: FailReason::Timeout,
        retcode: Some(TIMEOUT_RETCODE),
        msg: Some(format!("{} timed out after {}s", inv.command, inv.timeout.as_secs())),
    }
}

fn cancelled() -> Progress {
    Progress::Error { reason: FailReason::Cancelled, retcode: None, msg: None }
}

/// Where a step's tool comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSource {
    Builtin(String),
    /// Unpacked package; `entry` is an executable inside `dir`.
    Package { dir: PathBuf, entry: String },
}

/// Resolves `(tool, tool_location, tool_entry)` to a [`ToolSource`].
pub struct ToolLocator {
    registry: Registry,
    packages: PackageCache,
}

impl ToolLocator {
    pub fn new(tools_cache: impl Into<PathBuf>) -> Self {
        Self { registry: Registry::builtin(), packages: PackageCache::new(tools_cache) }
    }

    pub async fn locate(&self, cx: &Context, step: &Step) -> Result<ToolSource, HarnessError> {
        let location = step.tool_location.as_deref().filter(|l| !l.is_empty());
        let Some(location) = location else {
            return self.search(cx, step);
        };
        let entry = step.tool_entry.clone().unwrap_or_else(|| step.tool.clone());

        if location.starts_with("minio://") {
            let uri: ObjectUri = location.parse()?;
            let store = package_store(cx, step, &uri)?;
            let dir = self.packages.fetch(store.open()?.as_ref(), &uri).await?;
            return Ok(ToolSource::Package { dir, entry });
        }

        let dir = PathBuf::from(cx.expand(location));
        if dir.join(&entry).is_file() {
            return Ok(ToolSource::Package { dir, entry });
        }
        Err(HarnessError::UnknownTool(format!("{} at {location}", step.tool)))
    }

    /// Built-in tools, then `<tools_dir>/<tool>/<entry>`.
    fn search(&self, cx: &Context, step: &Step) -> Result<ToolSource, HarnessError> {
        if self.registry.contains(&step.tool) {
            return Ok(ToolSource::Builtin(step.tool.clone()));
        }
        let entry = step.tool_entry.clone().unwrap_or_else(|| step.tool.clone());
        for base in cx.settings().tools_dirs {
            let dir = base.join(&step.tool);
            if dir.join(&entry).is_file() {
                return Ok(ToolSource::Package { dir, entry });
            }
        }
        Err(HarnessError::UnknownTool(step.tool.clone()))
    }
}

/// Object store holding tool packages: the agent's override address, else
/// the step's; credentials from the agent environment, else the step.
fn package_store(cx: &Context, step: &Step, uri: &ObjectUri) -> Result<StoreConfig, FieldError> {
    let addr = cx
        .settings()
        .minio_addr
        .or_else(|| step.str_field("minio_addr").map(str::to_string))
        .ok_or_else(|| FieldError::Missing("minio_addr".to_string()))?;
    let access_key = crate::env::minio_access_key()
        .or_else(|| step.str_field("minio_access_key").map(str::to_string))
        .ok_or_else(|| FieldError::Missing("minio_access_key".to_string()))?;
    let secret_key = crate::env::minio_secret_key()
        .or_else(|| step.str_field("minio_secret_key").map(str::to_string))
        .ok_or_else(|| FieldError::Missing("minio_secret_key".to_string()))?;
    Ok(StoreConfig { addr, bucket: uri.bucket.clone(), access_key, secret_key })
}

/// Child-process harness.
pub struct ProcessHarness {
    tool_bin: PathBuf,
    locator: ToolLocator,
}

impl ProcessHarness {
    pub fn new(tool_bin: impl Into<PathBuf>, locator: ToolLocator) -> Self {
        Self { tool_bin: tool_bin.into(), locator }
    }

    fn command_line(&self, source: &ToolSource, addr: &str, inv: &Invocation<'_>) -> String {
        let (program, module) = match source {
            ToolSource::Builtin(name) => (self.tool_bin.clone(), name.as_str()),
            ToolSource::Package { dir, entry } => (dir.join(entry), entry.as_str()),
        };
        format!(
            "{} -r {addr} -s {} -m {} {}",
            quote(&program.to_string_lossy()),
            quote(&inv.step_file.to_string_lossy()),
            quote(module),
            inv.command,
        )
    }

    fn environment(&self, cx: &Context, source: &ToolSource, step: &Step) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = step.env().into_iter().collect();
        if let Some(addr) = cx.settings().minio_addr {
            env.push(("KRAKEN_MINIO_ADDR".to_string(), addr));
        }
        if let ToolSource::Package { dir, .. } = source {
            let dirs = kk_transfer::package::search_path(dir);
            for var in ["PATH", "PYTHONPATH"] {
                let mut parts: Vec<PathBuf> = dirs.clone();
                if let Some(existing) = std::env::var_os(var) {
                    parts.extend(std::env::split_paths(&existing));
                }
                if let Ok(joined) = std::env::join_paths(parts) {
                    env.push((var.to_string(), joined.to_string_lossy().into_owned()));
                }
            }
        }
        env
    }
}

#[async_trait]
impl Harness for ProcessHarness {
    async fn invoke(
        &self,
        cx: &Context,
        inv: &Invocation<'_>,
        batches: Option<mpsc::Sender<Batch>>,
    ) -> Result<Progress, HarnessError> {
        let source = self.locator.locate(cx, inv.step).await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        let cmd = self.command_line(&source, &addr, inv);

        let mut opts = kk_exec::ExecOptions::default()
            .cwd(inv.cwd())
            .timeout(inv.timeout)
            .cb_period(Duration::from_secs(1))
            .cancel(cx.cancel_token().clone())
            .kill_grace(CHILD_KILL_GRACE)
            .out_prefix(format!("{}: ", inv.step.tool));
        for (k, v) in self.environment(cx, &source, inv.step) {
            opts = opts.env_var(k, v);
        }

        let child_gone = CancellationToken::new();
        let reader = tokio::spawn(read_progress(listener, batches, child_gone.clone()));

        let outcome = kk_exec::run(&cmd, &opts).await;
        child_gone.cancel();
        let terminal = reader.await.map_err(|e| std::io::Error::other(e.to_string()))?;
        let outcome = outcome?;

        if outcome.timed_out {
            return Ok(timed_out(inv));
        }
        if outcome.stopped {
            return Ok(cancelled());
        }
        match terminal? {
            Some(progress) => Ok(progress),
            None => Err(HarnessError::NoResult {
                tool: inv.step.tool.clone(),
                command: inv.command,
                retcode: outcome.retcode,
            }),
        }
    }
}

/// Accept the child's connection and read until its terminal message.
///
/// Gives up waiting for a connection once `child_gone` fires; a connected
/// child is read to the end regardless.
async fn read_progress(
    listener: TcpListener,
    batches: Option<mpsc::Sender<Batch>>,
    child_gone: CancellationToken,
) -> Result<Option<Progress>, HarnessError> {
    let stream = tokio::select! {
        accepted = listener.accept() => accepted?.0,
        _ = child_gone.cancelled() => return Ok(None),
    };
    let mut reader = BufReader::new(stream);
    while let Some(progress) = kk_wire::read_line::<_, Progress>(&mut reader).await? {
        match progress {
            Progress::InProgress(batch) => {
                if let Some(tx) = &batches {
                    if tx.send(batch).await.is_err() {
                        tracing::warn!("results queue closed, dropping batch");
                    }
                }
            }
            terminal => return Ok(Some(terminal)),
        }
    }
    Ok(None)
}

/// In-process harness over the built-in registry.
pub struct BuiltinHarness {
    registry: Registry,
}

impl Default for BuiltinHarness {
    fn default() -> Self {
        Self { registry: Registry::builtin() }
    }
}

impl BuiltinHarness {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Harness for BuiltinHarness {
    async fn invoke(
        &self,
        cx: &Context,
        inv: &Invocation<'_>,
        batches: Option<mpsc::Sender<Batch>>,
    ) -> Result<Progress, HarnessError> {
        let tool = self.registry.get(&inv.step.tool)?;
        let tool_cx = cx.child();
        let (tx, mut rx) = mpsc::channel::<Progress>(kk_tools::BATCH_LIMIT);

        let (tool_ref, step, command, run_cx) = (tool.as_ref(), inv.step, inv.command, &tool_cx);
        let run = async move {
            let mut sink = ChannelSink::new(tx);
            session::execute(run_cx, tool_ref, command, step, &mut sink).await
        };
        let consume = async move {
            let mut terminal = None;
            while let Some(progress) = rx.recv().await {
                match progress {
                    Progress::InProgress(batch) => {
                        if let Some(tx) = &batches {
                            if tx.send(batch).await.is_err() {
                                tracing::warn!("results queue closed, dropping batch");
                            }
                        }
                    }
                    other => terminal = Some(other),
                }
            }
            terminal
        };
        let work = async { tokio::join!(run, consume) };
        tokio::pin!(work);

        // On timeout or cancel the tool is stopped through its context and
        // still awaited, so no child process outlives the call.
        let (stop, (ran, terminal)) = tokio::select! {
            done = &mut work => (None, done),
            _ = tokio::time::sleep(inv.timeout) => {
                tool_cx.cancel();
                (Some(timed_out(inv)), (&mut work).await)
            }
            _ = cx.cancel_token().cancelled() => (Some(cancelled()), (&mut work).await),
        };
        if let Some(stop) = stop {
            return Ok(stop);
        }
        ran?;
        terminal.ok_or_else(|| HarnessError::NoResult {
            tool: inv.step.tool.clone(),
            command: inv.command,
            retcode: -1,
        })
    }
}

#[cfg(test)]
#[path = "harness_tests.rs"]
mod tests;
