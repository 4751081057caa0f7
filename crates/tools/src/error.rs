// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kk_core::step::FieldError;
use kk_core::Command;
use kk_exec::ExecError;
use kk_transfer::TransferError;
use kk_wire::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad xml in {path}: {reason}")]
    Xml { path: String, reason: String },

    #[error("tool '{tool}' does not support '{command}'")]
    Unsupported { tool: String, command: Command },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// The agent went away; nothing more can be reported.
    #[error("progress channel closed: {0}")]
    SinkClosed(String),
}

impl ToolError {
    pub fn unsupported(tool: &str, command: Command) -> Self {
        ToolError::Unsupported { tool: tool.to_string(), command }
    }

    pub fn is_sink_closed(&self) -> bool {
        matches!(self, ToolError::SinkClosed(_))
    }
}

impl From<ProtocolError> for ToolError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Json(e) => ToolError::Json(e),
            other => ToolError::SinkClosed(other.to_string()),
        }
    }
}
