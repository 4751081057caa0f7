// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// How to run a command. Build with `ExecOptions::default()` plus setters.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub cwd: Option<PathBuf>,
    /// Added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
    /// How often the callback is polled while the child is alive.
    pub cb_period: Duration,
    /// Literal replaced by `******` in traced output and the traced command.
    pub mask: Option<String>,
    /// Trace each output line at info level.
    pub tracing: bool,
    pub out_prefix: String,
    /// Turn a non-zero exit into [`crate::ExecError::Failed`].
    pub raise_on_error: bool,
    /// Stop the command once cancelled, like a callback returning true.
    pub cancel: Option<CancellationToken>,
    /// Wait between SIGTERM and SIGKILL when stopping the command.
    pub kill_grace: Duration,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            env: BTreeMap::new(),
            timeout: kk_core::step::DEFAULT_STEP_TIMEOUT,
            cb_period: Duration::from_secs(5),
            mask: None,
            tracing: true,
            out_prefix: "output: ".to_string(),
            raise_on_error: false,
            cancel: None,
            kill_grace: Duration::from_secs(1),
        }
    }
}

impl ExecOptions {
    kk_core::setters! {
        into {
            out_prefix: String,
        }
        set {
            env: BTreeMap<String, String>,
            timeout: Duration,
            cb_period: Duration,
            tracing: bool,
            raise_on_error: bool,
            kill_grace: Duration,
        }
        option {
            cwd: PathBuf,
            mask: String,
            cancel: CancellationToken,
        }
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub(crate) fn masked<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        match &self.mask {
            Some(m) if !m.is_empty() => {
                kk_core::mask::mask_secret(text, m, kk_core::SecretPosition::Middle)
            }
            _ => std::borrow::Cow::Borrowed(text),
        }
    }
}
