// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Where progress lines go.

use async_trait::async_trait;
use kk_wire::Progress;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::error::ToolError;

/// Receiver of the harness's progress messages.
///
/// A failed send means the agent is gone: callers stop work and exit.
#[async_trait]
pub trait ProgressSink: Send {
    async fn send(&mut self, msg: &Progress) -> Result<(), ToolError>;
}

/// The return socket opened towards the agent (`-r host:port`).
pub struct TcpSink {
    stream: TcpStream,
}

impl TcpSink {
    pub async fn connect(addr: &str) -> Result<Self, ToolError> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            tracing::error!(%addr, error = %e, "problem with connecting to return address");
            ToolError::SinkClosed(format!("connect {addr}: {e}"))
        })?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

#[async_trait]
impl ProgressSink for TcpSink {
    async fn send(&mut self, msg: &Progress) -> Result<(), ToolError> {
        kk_wire::write_line(&mut self.stream, msg).await?;
        Ok(())
    }
}

/// Prints progress lines on stdout, for running a tool by hand.
#[derive(Default)]
pub struct StdoutSink;

#[async_trait]
impl ProgressSink for StdoutSink {
    async fn send(&mut self, msg: &Progress) -> Result<(), ToolError> {
        let line = kk_wire::encode_line(msg)?;
        let mut out = tokio::io::stdout();
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }
}

/// Hands progress to an in-process consumer (built-in harness mode).
pub struct ChannelSink {
    tx: mpsc::Sender<Progress>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Progress>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn send(&mut self, msg: &Progress) -> Result<(), ToolError> {
        self.tx
            .send(msg.clone())
            .await
            .map_err(|_| ToolError::SinkClosed("receiver dropped".to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::sync::Arc;

    use async_trait::async_trait;
    use kk_core::{Artifact, Issue, TestCaseResult};
    use kk_wire::Progress;
    use parking_lot::Mutex;

    use super::ProgressSink;
    use crate::error::ToolError;

    #[derive(Default)]
    struct State {
        messages: Vec<Progress>,
        fail_after: Option<usize>,
    }

    /// Records every message; can be told to start failing.
    #[derive(Clone, Default)]
    pub struct MemorySink {
        inner: Arc<Mutex<State>>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Accept `n` more messages, then fail as a dropped socket would.
        pub fn fail_after(&self, n: usize) {
            let mut state = self.inner.lock();
            state.fail_after = Some(state.messages.len() + n);
        }

        pub fn messages(&self) -> Vec<Progress> {
            self.inner.lock().messages.clone()
        }

        pub fn last(&self) -> Option<Progress> {
            self.inner.lock().messages.last().cloned()
        }

        /// Sizes of the `in-progress` batches, in order.
        pub fn batch_sizes(&self) -> Vec<usize> {
            self.inner
                .lock()
                .messages
                .iter()
                .filter_map(|m| match m {
                    Progress::InProgress(b) => Some(b.len()),
                    _ => None,
                })
                .collect()
        }

        pub fn test_results(&self) -> Vec<TestCaseResult> {
            self.batches().flat_map(|b| b.test_results).collect()
        }

        pub fn issues(&self) -> Vec<Issue> {
            self.batches().flat_map(|b| b.issues).collect()
        }

        pub fn artifacts(&self) -> Vec<Artifact> {
            self.batches().flat_map(|b| b.artifacts).collect()
        }

        pub fn data(&self) -> Vec<serde_json::Value> {
            self.batches().flat_map(|b| b.data).collect()
        }

        fn batches(&self) -> impl Iterator<Item = kk_wire::Batch> {
            self.messages().into_iter().filter_map(|m| match m {
                Progress::InProgress(b) => Some(b),
                _ => None,
            })
        }
    }

    #[async_trait]
    impl ProgressSink for MemorySink {
        async fn send(&mut self, msg: &Progress) -> Result<(), ToolError> {
            let mut state = self.inner.lock();
            if state.fail_after.is_some_and(|n| state.messages.len() >= n) {
                return Err(ToolError::SinkClosed("broken pipe".to_string()));
            }
            state.messages.push(msg.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::MemorySink;
