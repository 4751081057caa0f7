// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log records shipped to the central log store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Largest datagram payload before an entry is split.
pub const MAX_PAYLOAD: usize = 60 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Err,
}

crate::simple_display! {
    LogLevel {
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Err => "err",
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => LogLevel::Err,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::INFO => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

/// Fields attached to every entry emitted while they are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFields {
    pub agent_id: Option<u64>,
    pub job_id: Option<u64>,
    pub step_index: Option<usize>,
    pub tool: Option<String>,
}

/// Shared, mutable log context.
///
/// The agent updates it as it walks a job; log layers snapshot it per event.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    fields: Arc<RwLock<LogFields>>,
}

impl LogContext {
    pub fn snapshot(&self) -> LogFields {
        self.fields.read().clone()
    }

    pub fn set_agent(&self, agent_id: Option<u64>) {
        self.fields.write().agent_id = agent_id;
    }

    pub fn set_job(&self, job_id: Option<u64>) {
        let mut f = self.fields.write();
        f.job_id = job_id;
        f.step_index = None;
        f.tool = None;
    }

    pub fn set_step(&self, step_index: Option<usize>, tool: Option<String>) {
        let mut f = self.fields.write();
        f.step_index = step_index;
        f.tool = tool;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: String,
    pub message: String,
    pub service: String,
    pub host: String,
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

/// ISO-8601, UTC, microsecond precision.
pub fn format_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

impl LogEntry {
    pub fn new(
        service: &str,
        host: &str,
        level: LogLevel,
        message: impl Into<String>,
        fields: &LogFields,
    ) -> Self {
        Self {
            time: format_time(Utc::now()),
            message: message.into(),
            service: service.to_string(),
            host: host.to_string(),
            level,
            agent_id: fields.agent_id,
            job_id: fields.job_id,
            step_index: fields.step_index,
            tool: fields.tool.clone(),
        }
    }

    /// Serialize into one or more payloads no larger than `max` bytes.
    ///
    /// Oversized messages are split on line boundaries; a single line longer
    /// than the budget is cut at character boundaries.
    pub fn to_payloads(&self, max: usize) -> Result<Vec<Vec<u8>>, serde_json::Error> {
        let whole = serde_json::to_vec(self)?;
        if whole.len() <= max {
            return Ok(vec![whole]);
        }

        let mut empty = self.clone();
        empty.message.clear();
        let overhead = serde_json::to_vec(&empty)?.len();
        // JSON escaping can grow text; leave headroom for it.
        let budget = max.saturating_sub(overhead).max(64) / 2;

        let mut payloads = Vec::new();
        for chunk in split_lines(&self.message, budget) {
            let mut part = empty.clone();
            part.message = chunk;
            payloads.push(serde_json::to_vec(&part)?);
        }
        Ok(payloads)
    }
}

fn split_lines(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.split_inclusive('\n') {
        if current.len() + line.len() > budget && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if line.len() <= budget {
            current.push_str(line);
            continue;
        }
        let mut start = 0;
        while start < line.len() {
            let mut end = (start + budget).min(line.len());
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            chunks.push(line[start..end].to_string());
            start = end;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
#[path = "log_entry_tests.rs"]
mod tests;
