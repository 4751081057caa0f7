// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn `{cmd}`: {source}")]
    Spawn { cmd: String, source: std::io::Error },

    #[error("output spool error: {0}")]
    Spool(#[from] std::io::Error),

    /// Only returned when `raise_on_error` is set.
    #[error("command `{cmd}` exited with retcode {retcode}")]
    Failed { cmd: String, retcode: i32, output: String },
}

impl ExecError {
    pub fn retcode(&self) -> Option<i32> {
        match self {
            ExecError::Failed { retcode, .. } => Some(*retcode),
            _ => None,
        }
    }
}
