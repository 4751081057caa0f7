// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JUnit XML ingestion.

use std::path::Path;

use async_trait::async_trait;
use kk_core::{Command, Context, Step, TestCaseResult, TestStatus};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::work_dir;
use crate::{Collector, Outcome, Tool, ToolError};

pub struct JunitCollect;

const DEFAULT_GLOB: &str = "**/*.xml";

#[async_trait]
impl Tool for JunitCollect {
    fn name(&self) -> &'static str {
        "junit_collect"
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
        let base = work_dir(cx, step)?;
        let pattern = base.join(step.str_field("file_glob").unwrap_or(DEFAULT_GLOB));
        let pattern = pattern.to_string_lossy();
        let files = glob::glob(&pattern).map_err(|e| kk_core::FieldError::Invalid {
            field: "file_glob".to_string(),
            reason: e.to_string(),
        })?;

        let mut tally = [0usize; 6];
        for file in files.filter_map(Result::ok).filter(|p| p.is_file()) {
            tracing::info!(file = %file.display(), "parsing");
            let xml = tokio::fs::read_to_string(&file).await?;
            for result in parse_junit(&xml, &file)? {
                tally[u8::from(result.status) as usize] += 1;
                out.report(result).await?;
            }
        }
        tracing::info!(
            passed = tally[1],
            failed = tally[2],
            error = tally[3],
            disabled = tally[4],
            "junit results"
        );
        Ok(Outcome::ok())
    }
}

/// One result per `<testcase>`, named `classname::name`.
///
/// A case containing `<error>` is an error, else `<failure>` a failure,
/// else `<skipped>` disabled; anything else passed.
pub fn parse_junit(xml: &str, path: &Path) -> Result<Vec<TestCaseResult>, ToolError> {
    let bad = |e: quick_xml::Error| ToolError::Xml { path: path.display().to_string(), reason: e.to_string() };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut results = Vec::new();
    let mut open: Option<(TestCaseResult, Outcomes)> = None;
    loop {
        match reader.read_event().map_err(bad)? {
            Event::Start(e) if e.local_name().as_ref() == b"testcase" => {
                open = Some((case(&e).map_err(bad)?, Outcomes::default()));
            }
            Event::Empty(e) if e.local_name().as_ref() == b"testcase" => {
                results.push(case(&e).map_err(bad)?);
            }
            Event::End(e) if e.local_name().as_ref() == b"testcase" => {
                if let Some((mut result, seen)) = open.take() {
                    result.status = seen.status();
                    result.msg = seen.message;
                    results.push(result);
                }
            }
            Event::Start(e) | Event::Empty(e) => {
                if let Some((_, seen)) = open.as_mut() {
                    seen.note(&e).map_err(bad)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(results)
}

#[derive(Default)]
struct Outcomes {
    error: bool,
    failure: bool,
    skipped: bool,
    message: Option<String>,
}

impl Outcomes {
    fn note(&mut self, e: &BytesStart<'_>) -> Result<(), quick_xml::Error> {
        let flag = match e.local_name().as_ref() {
            b"error" => &mut self.error,
            b"failure" => &mut self.failure,
            b"skipped" => &mut self.skipped,
            _ => return Ok(()),
        };
        *flag = true;
        if self.message.is_none() {
            self.message = attr(e, "message")?;
        }
        Ok(())
    }

    fn status(&self) -> TestStatus {
        if self.error {
            TestStatus::Error
        } else if self.failure {
            TestStatus::Failed
        } else if self.skipped {
            TestStatus::Disabled
        } else {
            TestStatus::Passed
        }
    }
}

fn case(e: &BytesStart<'_>) -> Result<TestCaseResult, quick_xml::Error> {
    let class = attr(e, "classname")?.unwrap_or_default();
    let name = attr(e, "name")?.unwrap_or_default();
    Ok(TestCaseResult::new(format!("{class}::{name}"), TestStatus::Passed))
}

pub(crate) fn attr(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, quick_xml::Error> {
    match e.try_get_attribute(key)? {
        Some(a) => Ok(Some(a.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

#[cfg(test)]
#[path = "junit_tests.rs"]
mod tests;
