// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tool seam.

use async_trait::async_trait;
use kk_core::{Artifact, Command, Context, Issue, Step, StepResult, TestCaseResult};
use serde_json::Value;

use crate::collector::Collector;
use crate::error::ToolError;

/// What a tool reports when a command finishes: `(retcode, msg)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub retcode: i32,
    pub msg: String,
}

impl Outcome {
    pub fn ok() -> Self {
        Self { retcode: 0, msg: String::new() }
    }

    pub fn failed(retcode: i32, msg: impl Into<String>) -> Self {
        Self { retcode, msg: msg.into() }
    }

    pub fn is_ok(&self) -> bool {
        self.retcode == 0
    }

    pub fn into_result(self) -> StepResult {
        StepResult::from_retcode(self.retcode, self.msg)
    }
}

/// A tool the harness can drive.
///
/// Only the commands listed by [`Tool::commands`] are ever called; the
/// defaults report them as unsupported.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    /// Commands this tool implements, `get_commands` excluded.
    fn commands(&self) -> &'static [Command];

    async fn run(&self, _cx: &Context, _step: &Step) -> Result<Outcome, ToolError> {
        Err(ToolError::unsupported(self.name(), Command::Run))
    }

    async fn collect_tests(&self, _cx: &Context, _step: &Step) -> Result<Vec<String>, ToolError> {
        Err(ToolError::unsupported(self.name(), Command::CollectTests))
    }

    async fn run_tests(
        &self,
        _cx: &Context,
        _step: &Step,
        _out: &mut Collector<'_, TestCaseResult>,
    ) -> Result<Outcome, ToolError> {
        Err(ToolError::unsupported(self.name(), Command::RunTests))
    }

    async fn run_analysis(
        &self,
        _cx: &Context,
        _step: &Step,
        _out: &mut Collector<'_, Issue>,
    ) -> Result<Outcome, ToolError> {
        Err(ToolError::unsupported(self.name(), Command::RunAnalysis))
    }

    async fn run_artifacts(
        &self,
        _cx: &Context,
        _step: &Step,
        _out: &mut Collector<'_, Artifact>,
    ) -> Result<Outcome, ToolError> {
        Err(ToolError::unsupported(self.name(), Command::RunArtifacts))
    }

    async fn run_data(
        &self,
        _cx: &Context,
        _step: &Step,
        _out: &mut Collector<'_, Value>,
    ) -> Result<Outcome, ToolError> {
        Err(ToolError::unsupported(self.name(), Command::RunData))
    }
}
