// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pytest: collection, then one run per test with a JUnit report.

use async_trait::async_trait;
use kk_core::{Command, Context, Step, TestCaseResult, TestStatus};
use kk_exec::quote;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::junit::attr;
use super::{exec_options, work_dir};
use crate::{Collector, Outcome, Tool, ToolError};

pub struct PyTest;

const REPORT: &str = "result.xml";

#[async_trait]
impl Tool for PyTest {
    fn name(&self) -> &'static str {
        "pytest"
    }

    fn commands(&self) -> &'static [Command] {
        &[Command::CollectTests, Command::RunTests]
    }

    async fn collect_tests(&self, cx: &Context, step: &Step) -> Result<Vec<String>, ToolError> {
        let params = step.str_field("params").unwrap_or("").replace("-vv", "").replace("-v", "");
        let cmd = format!("PYTHONPATH=`pwd` pytest-3 --collect-only -q {params} | head -n -2");
        let ran = kk_exec::run(&cmd, &exec_options(cx, step).out_prefix("")).await?;
        Ok(collected(&ran.output))
    }

    async fn run_tests(
        &self,
        cx: &Context,
        step: &Step,
        out: &mut Collector<'_, TestCaseResult>,
    ) -> Result<Outcome, ToolError> {
        let params = dash_params(step.str_field("params").unwrap_or(""));
        let report = work_dir(cx, step)?.join(REPORT);
        let opts = exec_options(cx, step).out_prefix("");

        for test in step.tests() {
            let cmd = format!("PYTHONPATH=`pwd` pytest-3 -vv -r ap --junit-xml={REPORT} {params} {}", quote(&test));
            let ran = kk_exec::run(&cmd, &opts).await?;
            let status = if ran.retcode != 0 {
                TestStatus::Error
            } else {
                let xml = tokio::fs::read_to_string(&report).await?;
                report_status(&xml).map_err(|e| ToolError::Xml {
                    path: report.display().to_string(),
                    reason: e.to_string(),
                })?
            };
            out.report(TestCaseResult::new(test, status).with_cmd(cmd)).await?;
        }
        Ok(Outcome::ok())
    }
}

/// Test ids from `--collect-only -q` output.
pub(crate) fn collected(output: &str) -> Vec<String> {
    output.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
}

/// Only the flags of `params`; positional arguments are replaced by the test.
pub(crate) fn dash_params(params: &str) -> String {
    params.split_whitespace().filter(|p| p.starts_with('-')).collect::<Vec<_>>().join(" ")
}

/// Status from the counters on the first suite element of a JUnit report.
pub(crate) fn report_status(xml: &str) -> Result<TestStatus, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e)
                if matches!(e.local_name().as_ref(), b"testsuite" | b"testsuites") =>
            {
                let count = |key: &str| -> Result<u64, quick_xml::Error> {
                    Ok(attr(&e, key)?.and_then(|v| v.trim().parse().ok()).unwrap_or(0))
                };
                let (errors, failures) = (count("errors")?, count("failures")?);
                let skips = count("skips")? + count("skipped")?;
                if errors + failures + skips == 0 && e.local_name().as_ref() == b"testsuites" {
                    // Totals may live on the nested suite only.
                    continue;
                }
                return Ok(if errors > 0 {
                    TestStatus::Error
                } else if failures > 0 {
                    TestStatus::Failed
                } else if skips > 0 {
                    TestStatus::Disabled
                } else {
                    TestStatus::Passed
                });
            }
            Event::Eof => return Ok(TestStatus::Passed),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "pytest_tests.rs"]
mod tests;
