// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static analysis: pylint and `ng lint`.

use std::time::Duration;

use async_trait::async_trait;
use kk_core::{Command, Context, Issue, Step};
use kk_exec::quote;
use serde::Deserialize;

use super::{exec_options, exited, work_dir};
use crate::{Collector, Outcome, Tool, ToolError};

const LINT_TIMEOUT: Duration = Duration::from_secs(180);

pub struct PyLint;

#[async_trait]
impl Tool for PyLint {
    fn name(&self) -> &'static str {
        "pylint"
    }

    fn commands(&self) -> &'static [Command] {
        &[Command::RunAnalysis]
    }

    async fn run_analysis(
        &self,
        cx: &Context,
        step: &Step,
        out: &mut Collector<'_, Issue>,
    ) -> Result<Outcome, ToolError> {
        let rcfile = step.require_str("rcfile")?;
        let targets = step.require_str("modules_or_packages")?;
        let pylint = step.str_field("pylint_exe").unwrap_or("pylint");
        let blob = blob_url(cx, step).await;

        let cmd = format!("{pylint} --exit-zero -f json --rcfile={} {targets}", quote(rcfile));
        let opts = exec_options(cx, step).out_prefix("").timeout(LINT_TIMEOUT).tracing(false);
        let ran = kk_exec::run(&cmd, &opts).await?;
        if ran.retcode != 0 {
            return Ok(exited("pylint", ran.retcode));
        }

        for mut issue in parse_pylint(&ran.output)? {
            tracing::info!("{}:{}  {}", issue.path, issue.line, issue.message);
            if let Some(blob) = &blob {
                issue.url = Some(format!("{blob}/{}#L{}", issue.path, issue.line));
            }
            out.report(issue).await?;
        }
        Ok(Outcome::ok())
    }
}

pub struct NgLint;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NgFile {
    file_path: String,
    #[serde(default)]
    messages: Vec<NgMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NgMessage {
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    rule_id: Option<String>,
    #[serde(default)]
    severity: u8,
}

#[async_trait]
impl Tool for NgLint {
    fn name(&self) -> &'static str {
        "nglint"
    }

    fn commands(&self) -> &'static [Command] {
        &[Command::RunAnalysis]
    }

    async fn run_analysis(
        &self,
        cx: &Context,
        step: &Step,
        out: &mut Collector<'_, Issue>,
    ) -> Result<Outcome, ToolError> {
        let blob = blob_url(cx, step).await;
        let quiet = exec_options(cx, step).tracing(false);
        let toplevel = match kk_exec::run("git rev-parse --show-toplevel", &quiet).await {
            Ok(r) if r.retcode == 0 => r.output.trim().to_string(),
            _ => work_dir(cx, step)?.display().to_string(),
        };

        let opts = exec_options(cx, step).out_prefix("").timeout(LINT_TIMEOUT).tracing(false);
        let ran = kk_exec::run("npx ng lint --format json --force --silent", &opts).await?;
        if ran.retcode != 0 {
            return Ok(exited("ng lint", ran.retcode));
        }

        for mut issue in parse_nglint(&ran.output, &toplevel)? {
            tracing::info!("{}:{}  {}", issue.path, issue.line, issue.message);
            if let Some(blob) = &blob {
                issue.url = Some(format!("{blob}/{}#L{}", issue.path, issue.line));
            }
            out.report(issue).await?;
        }
        Ok(Outcome::ok())
    }
}

/// The JSON array in `output`; tools may print a banner around it.
fn json_array(output: &str) -> &str {
    match (output.find('['), output.rfind(']')) {
        (Some(start), Some(end)) if start < end => &output[start..=end],
        _ => output,
    }
}

pub(crate) fn parse_pylint(output: &str) -> Result<Vec<Issue>, ToolError> {
    Ok(serde_json::from_str(json_array(output))?)
}

/// Issues from `ng lint --format json`, paths relative to `toplevel`.
pub(crate) fn parse_nglint(output: &str, toplevel: &str) -> Result<Vec<Issue>, ToolError> {
    let files: Vec<NgFile> = serde_json::from_str(json_array(output))?;
    let prefix = format!("{}/", toplevel.trim_end_matches('/'));
    let mut issues = Vec::new();
    for file in files {
        let path = file.file_path.strip_prefix(&prefix).unwrap_or(&file.file_path).to_string();
        for m in file.messages {
            let kind = match m.severity {
                2 => "error",
                1 => "warning",
                _ => "other",
            };
            issues.push(Issue {
                path: path.clone(),
                line: m.line,
                column: m.column,
                message: m.message,
                symbol: m.message_id.or(m.rule_id).unwrap_or_default(),
                kind: kind.to_string(),
                url: None,
            });
        }
    }
    Ok(issues)
}

/// `https://<host>/<repo>/blob/<branch>` for the checkout at the step's
/// cwd, when it has an origin.
async fn blob_url(cx: &Context, step: &Step) -> Option<String> {
    let opts = exec_options(cx, step).tracing(false);
    let origin = kk_exec::run("git config --get remote.origin.url", &opts).await.ok()?;
    if origin.retcode != 0 {
        return None;
    }
    let branches = kk_exec::run("git branch -a -r --contains HEAD", &opts).await.ok();
    let branches = branches.filter(|r| r.retcode == 0).map(|r| r.output).unwrap_or_default();
    Some(blob_base(&origin.output, &branches))
}

pub(crate) fn blob_base(origin: &str, remote_branches: &str) -> String {
    let mut url = origin.trim();
    if let Some((_, rest)) = url.split_once('@') {
        url = rest;
    }
    let url = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://")).unwrap_or(url);
    let url = url.replace(':', "/");
    let url = url.strip_suffix(".git").unwrap_or(&url);

    let branch = remote_branches
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.contains("HEAD"))
        .find_map(|l| l.split_once('/').map(|(_, b)| b.to_string()))
        .unwrap_or_else(|| "master".to_string());
    format!("https://{url}/blob/{branch}")
}

#[cfg(test)]
#[path = "lint_tests.rs"]
mod tests;
