// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Values read from JSON files, one result per file.

use std::path::Path;

use async_trait::async_trait;
use kk_core::{Command, Context, Step, TestCaseResult, TestStatus, ValueStats};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::work_dir;
use crate::{Collector, Outcome, Tool, ToolError};

pub struct ValuesCollect;

#[derive(Debug, Deserialize)]
struct ValuesFile {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

#[async_trait]
impl Tool for ValuesCollect {
    fn name(&self) -> &'static str {
        "values_collect"
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
        let files: Vec<ValuesFile> = step.require("files")?;
        for file in files {
            let test = file.namespace.filter(|ns| !ns.is_empty()).unwrap_or_else(|| file.name.clone());
            let path = base.join(&file.name);
            let result = match tokio::fs::read_to_string(&path).await {
                Ok(text) => collect(test, &path, &text),
                Err(_) => TestCaseResult::new(test, TestStatus::Error)
                    .with_msg(format!("missing {} file", path.display())),
            };
            tracing::info!(test = %result.test, status = ?result.status, "values result");
            out.report(result).await?;
        }
        Ok(Outcome::ok())
    }
}

/// Result for one file's contents: each numeric top-level entry becomes a
/// value. Other entries are skipped.
pub(crate) fn collect(test: String, path: &Path, text: &str) -> TestCaseResult {
    let Ok(data) = serde_json::from_str::<Map<String, Value>>(text) else {
        return TestCaseResult::new(test, TestStatus::Error)
            .with_msg(format!("cannot parse {} file", path.display()));
    };
    let mut result = TestCaseResult::new(test, TestStatus::Passed);
    for (name, value) in data {
        match value.as_f64() {
            Some(v) => result = result.with_value(name, ValueStats { value: v, ..ValueStats::default() }),
            None => tracing::warn!(%name, %value, "skipping non-numeric value"),
        }
    }
    result
}

#[cfg(test)]
#[path = "values_tests.rs"]
mod tests;
