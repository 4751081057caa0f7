// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build artifacts to and from the FTP store.

use async_trait::async_trait;
use kk_core::{Artifact, Backoff, Command, Context, Step};
use kk_transfer::artifacts::{self, Visibility};
use kk_transfer::{FtpClient, FtpError, TransferError};

use super::work_dir;
use crate::{Collector, Outcome, Tool, ToolError};

pub struct Artifacts;

#[async_trait]
impl Tool for Artifacts {
    fn name(&self) -> &'static str {
        "artifacts"
    }

    fn commands(&self) -> &'static [Command] {
        &[Command::RunArtifacts]
    }

    async fn run_artifacts(
        &self,
        cx: &Context,
        step: &Step,
        out: &mut Collector<'_, Artifact>,
    ) -> Result<Outcome, ToolError> {
        let addr = step.require_str("storage_addr")?;
        let flow_id: u64 = step.require("flow_id")?;
        let run_id: u64 = step.require("run_id")?;
        let sources = step.string_list("source")?;
        let destination = step.str_field("destination").unwrap_or("");
        let download = step.str_field("action") == Some("download");
        let user = Visibility::from_public(step.bool_field("public")).login(flow_id);
        let base = work_dir(cx, step)?;

        tracing::info!(
            action = if download { "download" } else { "upload" },
            ?sources,
            %destination,
            %user,
            "artifacts"
        );
        let mut client = Backoff::default()
            .retry("ftp connect", FtpError::is_transient, || FtpClient::connect(addr, &user))
            .await
            .map_err(TransferError::from)?;

        let outcome = if download {
            match artifacts::download_latest(&mut client, run_id, &sources, &base.join(destination)).await {
                Ok(_) => Outcome::ok(),
                Err(e) => step_failure(e)?,
            }
        } else {
            upload(&mut client, run_id, &base, &sources, destination, out).await?
        };

        if let Err(e) = client.quit().await {
            tracing::debug!(error = %e, "ftp quit");
        }
        Ok(outcome)
    }
}

async fn upload(
    client: &mut FtpClient,
    run_id: u64,
    base: &std::path::Path,
    sources: &[String],
    destination: &str,
    out: &mut Collector<'_, Artifact>,
) -> Result<Outcome, ToolError> {
    let items = match artifacts::plan_upload(base, sources, destination) {
        Ok(items) => items,
        Err(e) => return step_failure(e),
    };
    for item in &items {
        let artifact = artifacts::upload_item(client, run_id, item).await?;
        out.report(artifact).await?;
    }
    tracing::info!(files = items.len(), "artifacts uploaded");
    Ok(Outcome::ok())
}

/// Failures that are the step's fault end the step with `retcode=1`; the
/// rest propagate.
fn step_failure(e: TransferError) -> Result<Outcome, ToolError> {
    match e {
        TransferError::NotFoundForUpload(_) | TransferError::Download(_) | TransferError::MissingPath(_) => {
            tracing::error!(error = %e, "artifacts failed");
            Ok(Outcome::failed(1, e.to_string()))
        }
        other => Err(other.into()),
    }
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
