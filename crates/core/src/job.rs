// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs as handed out by the dispatcher.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::Clock;
use crate::step::{Step, StepState};

/// Fallback when the server sends neither `deadline` nor `timeout`.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Where the job's steps execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Local,
    Docker,
    Lxd,
    #[serde(other)]
    Unknown,
}

crate::simple_display! {
    ExecutorKind {
        Local => "local",
        Docker => "docker",
        Lxd => "lxd",
        Unknown => "unknown",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    /// Absolute wall-clock deadline, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<f64>,
    /// Relative timeout in seconds, used when `deadline` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub executor: ExecutorKind,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
    /// Remove the working directory once the job reaches a terminal state.
    #[serde(default)]
    pub cleanup: bool,
}

impl Job {
    /// Pin step indices to their positions and resolve the deadline.
    ///
    /// Called once when the job is accepted; afterwards `deadline` is always set.
    pub fn accept(&mut self, clock: &impl Clock) {
        for (idx, step) in self.steps.iter_mut().enumerate() {
            step.index = idx;
        }
        if self.deadline.is_none() {
            let timeout = self.timeout.map(Duration::from_secs).unwrap_or(DEFAULT_JOB_TIMEOUT);
            self.deadline = Some(clock.epoch_ms() as f64 / 1000.0 + timeout.as_secs_f64());
        }
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline.map(|d| (d.max(0.0) * 1000.0) as u64)
    }

    /// Time left before the deadline: `None` when the job has no deadline,
    /// zero once it has passed.
    pub fn remaining(&self, clock: &impl Clock) -> Option<Duration> {
        let deadline = self.deadline_ms()?;
        Some(Duration::from_millis(deadline.saturating_sub(clock.epoch_ms())))
    }

    pub fn past_deadline(&self, clock: &impl Clock) -> bool {
        self.remaining(clock).is_some_and(|left| left.is_zero())
    }

    /// Steps still to run, in order.
    pub fn pending_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.status != StepState::Done)
    }

    /// Copy run context into a step before its step file is written.
    pub fn enrich_step(&self, step: &mut Step) {
        step.set("job_id", self.id);
        if let Some(v) = self.flow_id {
            step.set("flow_id", v);
        }
        if let Some(v) = self.run_id {
            step.set("run_id", v);
        }
        if let Some(v) = self.branch_id {
            step.set("branch_id", v);
        }
        if let Some(v) = &self.flow_kind {
            step.set("flow_kind", v.clone());
        }
        if let Some(v) = &self.trigger_data {
            step.set("trigger_data", v.clone());
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
