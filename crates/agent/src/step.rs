// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One step, from step file to terminal result.
//!
//! The tool is asked for its commands first. A tool that collects tests
//! gets its list split by the server before running. Streaming commands
//! then run in a fixed order, and `run` last with its attempts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use kk_core::{Clock, Command, Context, FailReason, Job, Step, StepResult, SystemClock};
use kk_wire::{Batch, Message, Progress};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::dispatch::Dispatcher;
use crate::error::{AgentError, HarnessError};
use crate::harness::{Harness, Invocation};
use crate::uploader::Uploader;

pub const GET_COMMANDS_TIMEOUT: Duration = Duration::from_secs(20);
pub const KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(10);

pub struct StepRunner<C: Clock = SystemClock> {
    dispatcher: Arc<dyn Dispatcher>,
    harness: Arc<dyn Harness>,
    clock: C,
    keep_alive: Duration,
}

impl StepRunner<SystemClock> {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, harness: Arc<dyn Harness>) -> Self {
        Self::with_clock(dispatcher, harness, SystemClock)
    }
}

impl<C: Clock> StepRunner<C> {
    pub fn with_clock(dispatcher: Arc<dyn Dispatcher>, harness: Arc<dyn Harness>, clock: C) -> Self {
        Self { dispatcher, harness, clock, keep_alive: KEEP_ALIVE_PERIOD }
    }

    kk_core::setters! {
        set {
            keep_alive: Duration,
        }
    }

    /// Run `step` of `job` in `workdir`; never fails, errors become
    /// `reason=exception` results carrying the error chain.
    pub async fn run(&self, cx: &Context, job: &Job, step: &mut Step, workdir: &Path) -> StepResult {
        let started = self.clock.now();
        cx.log().set_step(Some(step.index), Some(step.tool.clone()));
        tracing::info!(job_id = job.id, step = %step.label(), "step started");

        let result = match self.drive(cx, job, step, workdir).await {
            Ok(result) => result,
            Err(e) => {
                let msg = error_chain(&e);
                tracing::error!(job_id = job.id, step = %step.label(), error = %msg, "step interrupted by error");
                StepResult::exception(msg)
            }
        };
        let result = result.with_duration(self.clock.now().saturating_duration_since(started));
        tracing::info!(
            job_id = job.id,
            step = %step.label(),
            status = ?result.status,
            reason = ?result.reason,
            duration = result.duration,
            "step finished"
        );
        result
    }

    async fn drive(&self, cx: &Context, job: &Job, step: &mut Step, workdir: &Path) -> Result<StepResult, AgentError> {
        prepare_step(cx, job, step, workdir);
        let step_file = workdir.join(format!("step_{}.json", step.index));
        write_step_file(&step_file, step).await?;

        let commands = match self.command(cx, job, step, Command::GetCommands, &step_file, workdir).await? {
            Reply::Done(Progress::Done { commands: Some(commands), .. }) => commands,
            Reply::Done(failed @ Progress::Error { .. }) => return Ok(Reply::Done(failed).into_result()),
            Reply::Done(other) => return Err(bad_reply(step, Command::GetCommands, &other).into()),
            Reply::Stopped(result) => return Ok(result),
        };
        if !commands.iter().any(|c| Command::EXECUTING.contains(c)) {
            let reply = format!("no executing commands in {commands:?}");
            return Err(HarnessError::BadReply { tool: step.tool.clone(), command: Command::GetCommands, reply }.into());
        }
        tracing::info!(tool = %step.tool, ?commands, "tool commands");

        if commands.contains(&Command::CollectTests) && step.tests().is_empty() {
            if let Some(result) = self.dispatch_tests(cx, job, step, &step_file, workdir).await? {
                return Ok(result);
            }
        }

        for command in Command::STREAMING.into_iter().filter(|c| commands.contains(c)) {
            let result = self.command(cx, job, step, command, &step_file, workdir).await?.into_result();
            if result.is_error() {
                return Ok(result);
            }
        }

        if commands.contains(&Command::Run) {
            return self.run_attempts(cx, job, step, &step_file, workdir).await;
        }
        Ok(StepResult::done())
    }

    /// Collect the tool's tests and let the server pick this step's share.
    /// Returns a result when the step ends here.
    async fn dispatch_tests(
        &self,
        cx: &Context,
        job: &Job,
        step: &mut Step,
        step_file: &Path,
        workdir: &Path,
    ) -> Result<Option<StepResult>, AgentError> {
        let tests = match self.command(cx, job, step, Command::CollectTests, step_file, workdir).await? {
            Reply::Done(Progress::Done { tests, .. }) => tests.unwrap_or_default(),
            Reply::Done(other) => return Ok(Some(other.into_result().unwrap_or_else(StepResult::done))),
            Reply::Stopped(result) => return Ok(Some(result)),
        };
        tracing::info!(count = tests.len(), "collected tests");
        if tests.is_empty() {
            return Ok(Some(StepResult::error(FailReason::NoTests, "no tests collected")));
        }

        let resp = self
            .dispatcher
            .send(Message::DispatchTests { job_id: job.id, step_index: step.index, tests })
            .await?;
        if resp.cancel {
            cx.cancel();
            return Ok(Some(StepResult::cancelled()));
        }
        let subset = resp.tests.unwrap_or_default();
        tracing::info!(count = subset.len(), "tests assigned by server");
        if subset.is_empty() {
            return Ok(Some(StepResult::done()));
        }
        step.set_tests(subset);
        write_step_file(step_file, step).await?;
        Ok(None)
    }

    async fn run_attempts(
        &self,
        cx: &Context,
        job: &Job,
        step: &Step,
        step_file: &Path,
        workdir: &Path,
    ) -> Result<StepResult, AgentError> {
        let attempts = step.attempts();
        let mut attempt = 1;
        loop {
            let result = self.command(cx, job, step, Command::Run, step_file, workdir).await?.into_result();
            let final_reason = matches!(result.reason, Some(FailReason::Cancelled | FailReason::JobTimeout));
            if !result.is_error() || attempt >= attempts || final_reason {
                return Ok(result);
            }
            let pause = step.sleep_after_attempt();
            tracing::info!(attempt, attempts, pause_secs = pause.as_secs_f64(), "run failed, retrying");
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = cx.cancel_token().cancelled() => return Ok(StepResult::cancelled()),
            }
            attempt += 1;
        }
    }

    /// One harness command under the job deadline, with keep-alives while it
    /// runs. Streamed batches go through an uploader that is drained before
    /// this returns.
    async fn command(
        &self,
        cx: &Context,
        job: &Job,
        step: &Step,
        command: Command,
        step_file: &Path,
        workdir: &Path,
    ) -> Result<Reply, AgentError> {
        if cx.is_cancelled() {
            return Ok(Reply::Stopped(StepResult::cancelled()));
        }
        if job.past_deadline(&self.clock) {
            tracing::warn!(job_id = job.id, %command, "job deadline passed");
            return Ok(Reply::Stopped(StepResult::error(
                FailReason::JobTimeout,
                format!("job deadline passed before {command}"),
            )));
        }
        let limit = match command {
            Command::GetCommands => GET_COMMANDS_TIMEOUT,
            _ => step.timeout_or_default(),
        };
        let timeout = job.remaining(&self.clock).map_or(limit, |left| limit.min(left));
        let inv = Invocation { step, command, step_file, workdir, timeout };

        let uploader = command
            .is_streaming()
            .then(|| Uploader::spawn(Arc::clone(&self.dispatcher), cx.clone(), job.id, step.index));
        let progress = self.supervise(cx, job.id, &inv, uploader.as_ref().map(Uploader::sender)).await;
        if let Some(uploader) = uploader {
            // An undelivered batch fails the step even when the tool succeeded.
            let stats = uploader.finish().await?;
            tracing::info!(%command, batches = stats.batches, records = stats.records, "results uploaded");
        }
        Ok(Reply::Done(progress?))
    }

    async fn supervise(
        &self,
        cx: &Context,
        job_id: u64,
        inv: &Invocation<'_>,
        batches: Option<mpsc::Sender<Batch>>,
    ) -> Result<Progress, HarnessError> {
        let call = self.harness.invoke(cx, inv, batches);
        tokio::pin!(call);
        let mut ticker = tokio::time::interval(self.keep_alive);
        ticker.tick().await;
        loop {
            tokio::select! {
                progress = &mut call => return progress,
                _ = ticker.tick() => self.send_keep_alive(cx, job_id).await,
            }
        }
    }

    async fn send_keep_alive(&self, cx: &Context, job_id: u64) {
        match self.dispatcher.send(Message::KeepAlive { job_id }).await {
            Ok(resp) if resp.cancel => {
                tracing::info!(job_id, "job cancelled by server");
                cx.cancel();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(job_id, error = %e, "keep-alive failed"),
        }
    }
}

enum Reply {
    Done(Progress),
    /// Not run: cancelled or past the deadline.
    Stopped(StepResult),
}

impl Reply {
    fn into_result(self) -> StepResult {
        match self {
            Reply::Done(progress) => progress.into_result().unwrap_or_else(StepResult::done),
            Reply::Stopped(result) => result,
        }
    }
}

fn bad_reply(step: &Step, command: Command, reply: &Progress) -> HarnessError {
    HarnessError::BadReply { tool: step.tool.clone(), command, reply: format!("{reply:?}") }
}

/// Fill in run context, an absolute `cwd`, expanded `env` and the agent's
/// object-store override before the step file is written.
pub(crate) fn prepare_step(cx: &Context, job: &Job, step: &mut Step, workdir: &Path) {
    job.enrich_step(step);

    let cwd: PathBuf = match step.cwd() {
        Some(cwd) => workdir.join(cx.expand(cwd)),
        None => workdir.to_path_buf(),
    };
    step.set("cwd", cwd.to_string_lossy().into_owned());

    let env = step.env();
    if !env.is_empty() {
        let expanded: serde_json::Map<String, Value> =
            env.into_iter().map(|(k, v)| (k, Value::String(cx.expand(&v)))).collect();
        step.set("env", Value::Object(expanded));
    }

    if let Some(addr) = cx.settings().minio_addr {
        if step.field("minio_addr").is_some() {
            step.set("minio_addr", addr);
        }
    }
}

/// Step file readable by the owner only; it may carry secrets.
pub(crate) async fn write_step_file(path: &Path, step: &Step) -> Result<(), AgentError> {
    use tokio::io::AsyncWriteExt;

    let body = serde_json::to_vec_pretty(step)?;
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .await?;
    file.write_all(&body).await?;
    file.flush().await?;
    Ok(())
}

/// `outer: inner: root` for an error and its sources.
pub(crate) fn error_chain(e: &dyn std::error::Error) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = inner.source();
    }
    out
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
