// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kk_core::{FailReason, StepResult, StepStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::progress::Batch;

/// Envelope for every agent-to-dispatcher request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Agent address (its identity towards the dispatcher).
    pub address: String,
    #[serde(flatten)]
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "kebab-case")]
pub enum Message {
    HostInfo {
        info: HostInfo,
    },
    GetJob {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_seen: Option<String>,
    },
    StepResult {
        job_id: u64,
        step_index: usize,
        result: StepReport,
    },
    DispatchTests {
        job_id: u64,
        step_index: usize,
        tests: Vec<String>,
    },
    KeepAlive {
        job_id: u64,
    },
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::HostInfo { .. } => "host-info",
            Message::GetJob { .. } => "get-job",
            Message::StepResult { .. } => "step-result",
            Message::DispatchTests { .. } => "dispatch-tests",
            Message::KeepAlive { .. } => "keep-alive",
        }
    }
}

/// Host description sent at registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub system: String,
    pub system_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distro_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distro_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_id: Option<String>,
    pub agent_version: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    InProgress,
    Done,
    Error,
}

impl From<StepStatus> for ReportStatus {
    fn from(s: StepStatus) -> Self {
        match s {
            StepStatus::Done => ReportStatus::Done,
            StepStatus::Error => ReportStatus::Error,
        }
    }
}

/// Body of a `step-result` message: a progress batch or a terminal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retcode: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(flatten)]
    pub batch: Batch,
}

impl StepReport {
    /// Progress marker with no records.
    pub fn in_progress() -> Self {
        Self::batch(Batch::default())
    }

    pub fn batch(batch: Batch) -> Self {
        Self {
            status: ReportStatus::InProgress,
            retcode: None,
            reason: None,
            msg: None,
            duration: None,
            batch,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != ReportStatus::InProgress
    }
}

impl From<StepResult> for StepReport {
    fn from(r: StepResult) -> Self {
        Self {
            status: r.status.into(),
            retcode: r.retcode,
            reason: r.reason,
            msg: r.msg,
            duration: r.duration,
            batch: Batch::default(),
        }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
