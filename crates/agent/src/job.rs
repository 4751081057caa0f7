// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A job: its steps in order, one terminal report per executed step.

use std::path::Path;
use std::sync::Arc;

use kk_core::{
    Clock, Context, ExecutorKind, FailReason, Job, SecretPosition, StepResult, StepState, SystemClock,
};
use kk_wire::{Message, StepReport};

use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::step::StepRunner;

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
    Cancelled,
    TimedOut,
    /// A terminal report could not be delivered.
    Discarded,
}

kk_core::simple_display! {
    JobStatus {
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
        TimedOut => "timed-out",
        Discarded => "discarded",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: u64,
    pub status: JobStatus,
    /// Indices of the steps whose terminal result was reported.
    pub reported: Vec<usize>,
}

pub struct JobRunner<C: Clock = SystemClock> {
    dispatcher: Arc<dyn Dispatcher>,
    steps: StepRunner<C>,
    clock: C,
}

impl JobRunner<SystemClock> {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, steps: StepRunner<SystemClock>) -> Self {
        Self::with_clock(dispatcher, steps, SystemClock)
    }
}

impl<C: Clock> JobRunner<C> {
    pub fn with_clock(dispatcher: Arc<dyn Dispatcher>, steps: StepRunner<C>, clock: C) -> Self {
        Self { dispatcher, steps, clock }
    }

    /// Run `job` under a child of `cx`.
    ///
    /// Steps already `done` on the server are skipped. The first failing
    /// step ends the job. Secrets are masked for the job's lifetime.
    pub async fn run(&self, cx: &Context, mut job: Job) -> JobOutcome {
        job.accept(&self.clock);
        let cx = cx.child();
        cx.log().set_job(Some(job.id));
        register_secrets(&cx, &job);
        tracing::info!(
            job_id = job.id,
            steps = job.steps.len(),
            executor = %job.executor,
            deadline = job.deadline,
            "job received"
        );

        let workdir = cx.settings().jobs_dir().join(job.id.to_string());
        let outcome = self.walk(&cx, &mut job, &workdir).await;

        if job.cleanup {
            if let Err(e) = tokio::fs::remove_dir_all(&workdir).await {
                tracing::warn!(job_id = job.id, error = %e, "cannot remove job workdir");
            }
        }
        tracing::info!(job_id = job.id, status = %outcome.status, reported = outcome.reported.len(), "job finished");
        cx.masks().clear();
        cx.log().set_job(None);
        outcome
    }

    async fn walk(&self, cx: &Context, job: &mut Job, workdir: &Path) -> JobOutcome {
        let mut outcome = JobOutcome { job_id: job.id, status: JobStatus::Succeeded, reported: Vec::new() };
        let Some(first) = job.pending_steps().next().map(|s| s.index) else {
            tracing::info!(job_id = job.id, "no steps to run");
            return outcome;
        };

        // Failures before any step runs are charged to the first pending step.
        let setup = if job.executor != ExecutorKind::Local {
            Some(format!("executor '{}' is not supported by this agent", job.executor))
        } else {
            tokio::fs::create_dir_all(workdir)
                .await
                .err()
                .map(|e| format!("cannot create job workdir {}: {e}", workdir.display()))
        };
        if let Some(msg) = setup {
            tracing::error!(job_id = job.id, %msg, "job setup failed");
            outcome.status = JobStatus::Failed;
            if self.report(cx, job.id, first, StepResult::exception(msg)).await.is_ok() {
                outcome.reported.push(first);
            } else {
                outcome.status = JobStatus::Discarded;
            }
            return outcome;
        }

        for idx in 0..job.steps.len() {
            if job.steps[idx].status == StepState::Done {
                tracing::info!(job_id = job.id, step_index = idx, "step already done, skipping");
                continue;
            }
            let mut step = job.steps[idx].clone();
            let result = self.steps.run(cx, job, &mut step, workdir).await;
            job.steps[idx] = step;

            if self.report(cx, job.id, idx, result.clone()).await.is_err() {
                outcome.status = JobStatus::Discarded;
                return outcome;
            }
            outcome.reported.push(idx);

            if result.is_error() {
                outcome.status = match result.reason {
                    Some(FailReason::Cancelled) => JobStatus::Cancelled,
                    Some(FailReason::Timeout | FailReason::JobTimeout) => JobStatus::TimedOut,
                    _ => JobStatus::Failed,
                };
                return outcome;
            }
            if cx.is_cancelled() {
                outcome.status = JobStatus::Cancelled;
                return outcome;
            }
        }
        outcome
    }

    async fn report(&self, cx: &Context, job_id: u64, step_index: usize, result: StepResult) -> Result<(), DispatchError> {
        let msg = Message::StepResult { job_id, step_index, result: StepReport::from(result) };
        match self.dispatcher.send(msg).await {
            Ok(resp) => {
                if resp.cancel && !cx.is_cancelled() {
                    tracing::info!(job_id, "job cancelled by server");
                    cx.cancel();
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(job_id, step_index, error = %e, "cannot report step result, discarding job");
                Err(e)
            }
        }
    }
}

/// Job secrets and every step's masked fields, as `middle` masks.
fn register_secrets(cx: &Context, job: &Job) {
    for secret in &job.secrets {
        cx.masks().add_mask_secret(secret, SecretPosition::Middle);
    }
    for step in &job.steps {
        for value in step.masked_values() {
            cx.masks().add_mask_secret(&value, SecretPosition::Middle);
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
