// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background relay of progress batches to the dispatcher.

use std::sync::Arc;

use kk_core::Context;
use kk_wire::{Batch, Message, StepReport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dispatch::Dispatcher;
use crate::error::AgentError;

/// Batches buffered between the harness reader and the network.
pub const QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub batches: usize,
    pub records: usize,
}

/// Sends each queued batch as an `in-progress` step result, in order.
///
/// A reply with `cancel` cancels the context the uploader was spawned with.
/// A batch the dispatcher refuses (after its own retries) is not lost
/// silently: the relay keeps sending the rest and [`Uploader::finish`]
/// reports the failure.
pub struct Uploader {
    tx: mpsc::Sender<Batch>,
    task: JoinHandle<Result<UploadStats, AgentError>>,
}

impl Uploader {
    pub fn spawn(dispatcher: Arc<dyn Dispatcher>, cx: Context, job_id: u64, step_index: usize) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let task = tokio::spawn(relay(dispatcher, cx, job_id, step_index, rx));
        Self { tx, task }
    }

    /// Producer handle; the queue closes when every sender is gone.
    pub fn sender(&self) -> mpsc::Sender<Batch> {
        self.tx.clone()
    }

    /// Close the queue and wait until everything queued has been sent.
    pub async fn finish(self) -> Result<UploadStats, AgentError> {
        drop(self.tx);
        self.task.await.map_err(|e| AgentError::UploaderCrashed(e.to_string()))?
    }
}

async fn relay(
    dispatcher: Arc<dyn Dispatcher>,
    cx: Context,
    job_id: u64,
    step_index: usize,
    mut rx: mpsc::Receiver<Batch>,
) -> Result<UploadStats, AgentError> {
    let mut stats = UploadStats::default();
    let mut failed = 0;
    let mut first_error = None;
    while let Some(batch) = rx.recv().await {
        if batch.is_empty() {
            continue;
        }
        let records = batch.len();
        let msg = Message::StepResult { job_id, step_index, result: StepReport::batch(batch) };
        match dispatcher.send(msg).await {
            Ok(resp) => {
                stats.batches += 1;
                stats.records += records;
                tracing::debug!(job_id, step_index, records, "progress batch sent");
                if resp.cancel && !cx.is_cancelled() {
                    tracing::info!(job_id, "job cancelled by server");
                    cx.cancel();
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!(job_id, step_index, records, error = %e, "cannot send progress batch");
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(source) => Err(AgentError::Upload { failed, source }),
        None => Ok(stats),
    }
}

#[cfg(test)]
#[path = "uploader_tests.rs"]
mod tests;
