// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `go test -json`, reported while the tests run.

use async_trait::async_trait;
use kk_core::{Command, Context, Step, TestCaseResult, TestStatus};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::{exec_options, exited};
use crate::{Collector, Outcome, Tool, ToolError};

pub struct GoTest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TestEvent {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    package: Option<String>,
    #[serde(default)]
    test: Option<String>,
    #[serde(default)]
    output: Option<String>,
}

#[async_trait]
impl Tool for GoTest {
    fn name(&self) -> &'static str {
        "gotest"
    }

    fn commands(&self) -> &'static [Command] {
        &[Command::RunTests]
    }

    async fn run_tests(
        &self,
        cx: &Context,
        step: &Step,
        out: &mut Collector<'_, TestCaseResult>,
    ) -> Result<Outcome, ToolError> {
        let go = step.str_field("go_exe").unwrap_or("go");
        let params = step.str_field("params").unwrap_or("");
        let cmd = format!("{go} test -json {params}");
        let opts = exec_options(cx, step).tracing(false);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let run = async move {
            let mut handler = move |line: &str| {
                if let Some(result) = parse_event(line) {
                    let _ = tx.send(result);
                }
            };
            let handler: &mut (dyn FnMut(&str) + Send) = &mut handler;
            kk_exec::run_with(&cmd, &opts, Some(handler), None).await
        };
        let report = async {
            while let Some(result) = rx.recv().await {
                out.report(result).await?;
            }
            Ok::<(), ToolError>(())
        };
        let (ran, reported) = tokio::join!(run, report);
        reported?;
        let ran = ran?;

        if ran.retcode != 0 {
            return Ok(exited("go test", ran.retcode));
        }
        Ok(Outcome::ok())
    }
}

/// A finished test from one line of `go test -json`; `None` for anything
/// else, unparseable lines included.
pub(crate) fn parse_event(line: &str) -> Option<TestCaseResult> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let event: TestEvent = match serde_json::from_str(line) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(%line, error = %e, "failed parsing go test output");
            return None;
        }
    };
    if let Some(output) = &event.output {
        tracing::info!("{}", output.trim_end());
    }
    let status = match event.action.as_deref()? {
        "pass" => TestStatus::Passed,
        "fail" => TestStatus::Failed,
        "skip" => TestStatus::Disabled,
        _ => return None,
    };
    let test = event.test?;
    let test = match event.package {
        Some(pkg) => format!("{pkg}::{test}"),
        None => test,
    };
    Some(TestCaseResult::new(test, status))
}

#[cfg(test)]
#[path = "gotest_tests.rs"]
mod tests;
