// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server replied {status}: {body}")]
    Status { status: u16, body: String },

    #[error("bad reply: {0}")]
    Json(#[from] serde_json::Error),
}

impl DispatchError {
    /// Worth another try: connection trouble, timeouts and 5xx replies.
    pub fn is_transient(&self) -> bool {
        match self {
            DispatchError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            DispatchError::Status { status, .. } => *status >= 500,
            DispatchError::Json(_) => false,
        }
    }
}

/// Failures running one harness command.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Exec(#[from] kk_exec::ExecError),

    #[error("bad progress from tool: {0}")]
    Protocol(#[from] kk_wire::ProtocolError),

    #[error("cannot write step file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Tool(#[from] kk_tools::ToolError),

    #[error("tool package: {0}")]
    Transfer(#[from] kk_transfer::TransferError),

    #[error(transparent)]
    Uri(#[from] kk_core::UriError),

    #[error(transparent)]
    Field(#[from] kk_core::FieldError),

    #[error("cannot find tool '{0}'")]
    UnknownTool(String),

    #[error("{command} of {tool} exited with retcode {retcode} without reporting a result")]
    NoResult { tool: String, command: kk_core::Command, retcode: i32 },

    #[error("{command} of {tool} replied {reply}")]
    BadReply { tool: String, command: kk_core::Command, reply: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no server address: pass --server or set KRAKEN_SERVER_ADDR")]
    MissingServer,

    #[error("server address '{0}' must start with http:// or https://")]
    BadServer(String),

    #[error("cannot read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("bad config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// Agent-level failures.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("dispatcher: {0}")]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot write step file: {0}")]
    StepFile(#[from] serde_json::Error),

    #[error("cannot create {path}: {source}")]
    Dir { path: PathBuf, source: std::io::Error },

    #[error("{failed} progress batch(es) not delivered: {source}")]
    Upload { failed: usize, source: DispatchError },

    #[error("results uploader crashed: {0}")]
    UploaderCrashed(String),

    #[error("logging setup failed: {0}")]
    Logging(String),
}
