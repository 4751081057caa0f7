// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batching of streamed records.

use std::time::Duration;

use kk_core::{Artifact, Issue, TestCaseResult};
use kk_wire::{Batch, Progress};
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ToolError;
use crate::sink::ProgressSink;

/// Records held before a batch is sent.
pub const BATCH_LIMIT: usize = 100;
/// Longest a record waits for its batch once reported.
pub const FLUSH_PERIOD: Duration = Duration::from_secs(20);

/// A record kind that travels in a [`Batch`].
pub trait Record: Send {
    fn into_batch(items: Vec<Self>) -> Batch
    where
        Self: Sized;
}

impl Record for TestCaseResult {
    fn into_batch(items: Vec<Self>) -> Batch {
        Batch { test_results: items, ..Batch::default() }
    }
}

impl Record for Issue {
    fn into_batch(items: Vec<Self>) -> Batch {
        Batch { issues: items, ..Batch::default() }
    }
}

impl Record for Artifact {
    fn into_batch(items: Vec<Self>) -> Batch {
        Batch { artifacts: items, ..Batch::default() }
    }
}

impl Record for Value {
    fn into_batch(items: Vec<Self>) -> Batch {
        Batch { data: items, ..Batch::default() }
    }
}

/// Buffers records and sends them as `in-progress` batches.
///
/// A batch goes out once [`BATCH_LIMIT`] records are held or
/// [`FLUSH_PERIOD`] has passed since the last send. [`Collector::finish`]
/// sends whatever is left and must run before the terminal message.
pub struct Collector<'s, T> {
    sink: &'s mut dyn ProgressSink,
    items: Vec<T>,
    last_flush: Instant,
    limit: usize,
    period: Duration,
    reported: usize,
}

impl<'s, T: Record> Collector<'s, T> {
    pub fn new(sink: &'s mut dyn ProgressSink) -> Self {
        Self::with_limits(sink, BATCH_LIMIT, FLUSH_PERIOD)
    }

    pub fn with_limits(sink: &'s mut dyn ProgressSink, limit: usize, period: Duration) -> Self {
        Self { sink, items: Vec::new(), last_flush: Instant::now(), limit: limit.max(1), period, reported: 0 }
    }

    pub async fn report(&mut self, item: T) -> Result<(), ToolError> {
        self.items.push(item);
        self.reported += 1;
        if self.items.len() >= self.limit || self.last_flush.elapsed() >= self.period {
            self.flush().await?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), ToolError> {
        if self.items.is_empty() {
            return Ok(());
        }
        let items = std::mem::take(&mut self.items);
        tracing::debug!(count = items.len(), "sending batch");
        self.sink.send(&Progress::InProgress(T::into_batch(items))).await?;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Send the remainder; returns how many records were reported in total.
    pub async fn finish(mut self) -> Result<usize, ToolError> {
        self.flush().await?;
        Ok(self.reported)
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
