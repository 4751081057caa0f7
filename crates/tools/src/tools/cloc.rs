// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line counts from `cloc`, one result per file plus the `SUM` row.

use async_trait::async_trait;
use kk_core::{Command, Context, Step, TestCaseResult, TestStatus, ValueStats};
use kk_exec::quote;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{exec_options, exited};
use crate::{Collector, Outcome, Tool, ToolError};

pub struct Cloc;

#[derive(Debug, Deserialize)]
struct Counts {
    #[serde(default)]
    blank: u64,
    #[serde(default)]
    comment: u64,
    #[serde(default)]
    code: u64,
    #[serde(default, rename = "nFiles")]
    files: Option<u64>,
}

#[async_trait]
impl Tool for Cloc {
    fn name(&self) -> &'static str {
        "cloc"
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
        let cmd = command(step);
        let opts = exec_options(cx, step).out_prefix("").tracing(false);
        let ran = kk_exec::run(&cmd, &opts).await?;
        if ran.retcode != 0 {
            return Ok(exited("cloc", ran.retcode));
        }
        for result in parse_report(&ran.output)? {
            out.report(result).await?;
        }
        Ok(Outcome::ok())
    }
}

fn command(step: &Step) -> String {
    let mut cmd = String::from("cloc . --json --by-file");
    if let Some(pattern) = step.str_field("not-match-f") {
        cmd.push_str(&format!(" --not-match-f {}", quote(pattern)));
    }
    if let Some(dirs) = step.str_field("exclude-dir") {
        cmd.push_str(&format!(" --exclude-dir {}", quote(dirs)));
    }
    cmd
}

/// Turn cloc's JSON report into results. Anything around the JSON object
/// (warnings on stderr) is ignored.
pub(crate) fn parse_report(output: &str) -> Result<Vec<TestCaseResult>, ToolError> {
    let json = match (output.find('{'), output.rfind('}')) {
        (Some(start), Some(end)) if start < end => &output[start..=end],
        _ => output,
    };
    let report: Map<String, Value> = serde_json::from_str(json)?;

    let mut results = Vec::new();
    for (name, counts) in report {
        if name == "header" {
            continue;
        }
        let counts: Counts = serde_json::from_value(counts)?;
        let total = counts.blank + counts.comment + counts.code;
        results.push(
            TestCaseResult::new(name, TestStatus::Passed)
                .with_value("blank", ValueStats::single(counts.blank as f64))
                .with_value("comment", ValueStats::single(counts.comment as f64))
                .with_value("code", ValueStats::single(counts.code as f64))
                .with_value("total", ValueStats::single(total as f64))
                .with_value("files", ValueStats::single(counts.files.unwrap_or(1) as f64)),
        );
    }
    Ok(results)
}

#[cfg(test)]
#[path = "cloc_tests.rs"]
mod tests;
