// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory caches in the object store.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use kk_core::{Command, Context, FieldError, Step};
use kk_transfer::{cache, StoreConfig, TransferError};
use object_store::ObjectStore;

use super::work_dir;
use crate::{Outcome, Tool, ToolError};

pub struct Cache;

#[async_trait]
impl Tool for Cache {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn commands(&self) -> &'static [Command] {
        &[Command::Run]
    }

    async fn run(&self, cx: &Context, step: &Step) -> Result<Outcome, ToolError> {
        let store = StoreConfig::from_step(step)?.open()?;
        let base = work_dir(cx, step)?;
        run_with_store(cx, step, store.as_ref(), &base).await
    }
}

pub(crate) async fn run_with_store(
    cx: &Context,
    step: &Step,
    store: &dyn ObjectStore,
    base: &Path,
) -> Result<Outcome, ToolError> {
    match step.require_str("action")? {
        "save" => {
            let job_id: u64 = step.require("job_id")?;
            let paths: Vec<String> = step.string_list("paths")?.iter().map(|p| cx.expand(p)).collect();
            let folders: BTreeMap<String, String> = step.require("minio_folder")?;
            let Some((key, folder)) = folders.into_iter().next() else {
                return Err(invalid("minio_folder", "expected one cache key"));
            };
            tracing::info!(cache_key = %key, %folder, ?paths, "cache save");
            match cache::save(store, base, &folder, job_id, &paths).await {
                Ok(meta) => {
                    tracing::info!(entries = meta.0.len(), "cache saved");
                    Ok(Outcome::ok())
                }
                Err(e @ TransferError::MissingPath(_)) => Ok(Outcome::failed(1, e.to_string())),
                Err(e) => Err(e.into()),
            }
        }
        "restore" => {
            let folders: BTreeMap<String, String> = step.require("minio_folders")?;
            let restored = cache::restore(store, base, &folders).await?;
            tracing::info!(restored, "cache restored");
            Ok(Outcome::ok())
        }
        other => Err(invalid("action", &format!("unknown action '{other}'"))),
    }
}

fn invalid(field: &str, reason: &str) -> ToolError {
    FieldError::Invalid { field: field.to_string(), reason: reason.to_string() }.into()
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
