// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kk_core::{Artifact, Command, FailReason, Issue, StepResult, TestCaseResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Records streamed while a command runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(rename = "test-results", default, skip_serializing_if = "Vec::is_empty")]
    pub test_results: Vec<TestCaseResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Value>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.test_results.len() + self.issues.len() + self.artifacts.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One line on the harness return socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Progress {
    InProgress(Batch),
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        commands: Option<Vec<Command>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tests: Option<Vec<String>>,
    },
    Error {
        reason: FailReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retcode: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        msg: Option<String>,
    },
}

impl Progress {
    pub fn done() -> Self {
        Progress::Done { commands: None, tests: None }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Progress::InProgress(_))
    }

    /// Terminal step result carried by this message, if any.
    pub fn into_result(self) -> Option<StepResult> {
        match self {
            Progress::InProgress(_) => None,
            Progress::Done { .. } => Some(StepResult::done()),
            Progress::Error { reason, retcode, msg } => {
                let mut r = StepResult::error(reason, msg.unwrap_or_default());
                r.retcode = retcode;
                Some(r)
            }
        }
    }
}

impl From<StepResult> for Progress {
    fn from(r: StepResult) -> Self {
        match r.reason {
            None => Progress::done(),
            Some(reason) => Progress::Error { reason, retcode: r.retcode, msg: r.msg },
        }
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
