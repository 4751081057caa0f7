// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository checkout.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use kk_core::{Command, Context, SecretPosition, Step};
use kk_exec::quote;
use serde::Deserialize;
use serde_json::Value;

use super::{exec_options, exited};
use crate::{Outcome, Tool, ToolError};

pub struct Git;

const CLONE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Deserialize)]
struct SshKey {
    key: String,
}

#[async_trait]
impl Tool for Git {
    fn name(&self) -> &'static str {
        "git"
    }

    fn commands(&self) -> &'static [Command] {
        &[Command::Run]
    }

    async fn run(&self, cx: &Context, step: &Step) -> Result<Outcome, ToolError> {
        let mut url = step.require_str("checkout")?.to_string();
        let dest = step.str_field("destination").unwrap_or("");
        let mut opts = exec_options(cx, step).out_prefix("").timeout(step.timeout().unwrap_or(CLONE_TIMEOUT));

        // Kept alive until the clone is done.
        let mut key_file = None;
        if let Some(ssh) = step.get::<SshKey>("ssh-key")? {
            let mut file = tempfile::Builder::new().prefix("kk-ssh-").tempfile()?;
            file.write_all(ssh.key.trim_end().as_bytes())?;
            file.write_all(b"\n")?;
            file.flush()?;
            opts = opts.env_var("GIT_SSH_COMMAND", ssh_command(file.path()));
            key_file = Some(file);
        } else if let Some(token) = step.str_field("access-token").filter(|t| !t.is_empty()) {
            cx.masks().add_mask_secret(token, SecretPosition::Middle);
            opts = opts.mask(token);
            url = token_url(&url, token);
        }

        let mut clone = format!("git clone {}", quote(&url));
        if !dest.is_empty() {
            clone.push_str(&format!(" {}", quote(dest)));
        }
        let ran = kk_exec::run(&clone, &opts).await?;
        drop(key_file);
        if ran.retcode != 0 {
            return Ok(exited("git clone", ran.retcode));
        }

        if let Some(commit) = triggered_commit(step) {
            let repo_dir = if dest.is_empty() { repo_dir(&url) } else { dest.to_string() };
            let base = opts.cwd.clone().unwrap_or_default();
            let opts = exec_options(cx, step).out_prefix("").cwd(base.join(repo_dir));
            let ran = kk_exec::run(&format!("git checkout {}", quote(&commit)), &opts).await?;
            if ran.retcode != 0 {
                return Ok(exited("git checkout", ran.retcode));
            }
        }
        Ok(Outcome::ok())
    }
}

fn ssh_command(key: &std::path::Path) -> String {
    format!("ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=no", quote(&key.to_string_lossy()))
}

/// `git@host:org/repo.git` or `host/org/repo` as an https URL carrying `token`.
pub(crate) fn token_url(url: &str, token: &str) -> String {
    let bare = url.strip_prefix("git@").unwrap_or(url);
    let bare = bare.strip_prefix("https://").unwrap_or(bare);
    format!("https://{token}@{}", bare.replace(':', "/"))
}

/// Directory `git clone` creates for `url`.
pub(crate) fn repo_dir(url: &str) -> String {
    let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// Commit to check out when the trigger came from this repository.
fn triggered_commit(step: &Step) -> Option<String> {
    let trigger = step.field("trigger_data")?;
    let repo = trigger.get("repo").and_then(Value::as_str)?;
    if Some(repo) != step.str_field("http_url") {
        return None;
    }
    trigger.get("after").and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
