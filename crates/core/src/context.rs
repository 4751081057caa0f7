// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-wide context passed explicitly to the job runner and to tools.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::log_entry::LogContext;
use crate::mask::MaskRegistry;

/// Runtime settings shared by agent and tools.
///
/// The server can change some of them mid-flight through `cfg` in its
/// replies; readers take a snapshot with [`Context::settings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub tools_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub clickhouse_addr: Option<String>,
    /// Overrides the object-store address carried by transfer steps.
    #[serde(default)]
    pub minio_addr: Option<String>,
    #[serde(default)]
    pub system_id: Option<String>,
    /// Values available to `${VAR}` expansion in step environments.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl Settings {
    pub fn jobs_dir(&self) -> PathBuf {
        self.data_dir.join("jobs")
    }

    pub fn tools_cache_dir(&self) -> PathBuf {
        self.data_dir.join("tools")
    }

    /// Apply a `cfg` object from the server; returns the keys that changed.
    pub fn merge_remote(&mut self, cfg: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
        let mut changed = Vec::new();
        for (key, value) in cfg {
            let text = value.as_str().map(str::to_string);
            let slot = match key.as_str() {
                "clickhouse_addr" => &mut self.clickhouse_addr,
                "minio_addr" => &mut self.minio_addr,
                "server" => &mut self.server,
                _ => continue,
            };
            if *slot != text {
                *slot = text;
                changed.push(key.clone());
            }
        }
        changed
    }
}

/// Configuration, log context, masks and cancellation for one unit of work.
///
/// Cloning is cheap and shares everything. [`Context::child`] shares settings,
/// masks and log context but gets a cancellation token of its own that is
/// also cancelled with the parent.
#[derive(Clone, Debug)]
pub struct Context {
    settings: Arc<RwLock<Settings>>,
    masks: MaskRegistry,
    log: LogContext,
    cancel: CancellationToken,
}

impl Context {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            masks: MaskRegistry::new(),
            log: LogContext::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_parts(settings: Settings, masks: MaskRegistry, log: LogContext) -> Self {
        Self { settings: Arc::new(RwLock::new(settings)), masks, log, cancel: CancellationToken::new() }
    }

    pub fn child(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            masks: self.masks.clone(),
            log: self.log.clone(),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn update_settings<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        f(&mut self.settings.write())
    }

    pub fn masks(&self) -> &MaskRegistry {
        &self.masks
    }

    pub fn log(&self) -> &LogContext {
        &self.log
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Expand `$VAR`, `${VAR}` and a leading `~` using settings vars, then the
    /// process environment.
    pub fn expand(&self, input: &str) -> String {
        let vars = self.settings.read().vars.clone();
        crate::vars::expand(input, |name| {
            vars.get(name).cloned().or_else(|| std::env::var(name).ok())
        })
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
