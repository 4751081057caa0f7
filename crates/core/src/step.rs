// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steps and the tool commands that run them.
//!
//! A step is a flat JSON object: a handful of well-known keys plus an open
//! set of tool-specific fields (`cmd`, `cwd`, `paths`, `minio_bucket`...).
//! Unknown keys are kept verbatim in [`Step::fields`] so the step file the
//! harness reads is the same document the server sent, plus what the agent
//! injects.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Default per-step timeout for tools that run a command.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(60);

/// A command the harness can run against a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    GetCommands,
    CollectTests,
    Run,
    RunTests,
    RunAnalysis,
    RunArtifacts,
    RunData,
}

crate::simple_display! {
    Command {
        GetCommands => "get_commands",
        CollectTests => "collect_tests",
        Run => "run",
        RunTests => "run_tests",
        RunAnalysis => "run_analysis",
        RunArtifacts => "run_artifacts",
        RunData => "run_data",
    }
}

impl Command {
    /// Streaming commands in the order the agent runs them, before `run`.
    pub const STREAMING: [Command; 4] =
        [Command::RunTests, Command::RunAnalysis, Command::RunArtifacts, Command::RunData];

    /// Commands that do real work (at least one must be advertised).
    pub const EXECUTING: [Command; 5] = [
        Command::Run,
        Command::RunTests,
        Command::RunAnalysis,
        Command::RunArtifacts,
        Command::RunData,
    ];

    /// Key of the batched record array this command streams, if any.
    pub fn progress_key(self) -> Option<&'static str> {
        match self {
            Command::RunTests => Some("test-results"),
            Command::RunAnalysis => Some("issues"),
            Command::RunArtifacts => Some("artifacts"),
            Command::RunData => Some("data"),
            _ => None,
        }
    }

    pub fn is_streaming(self) -> bool {
        self.progress_key().is_some()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "get_commands" => Command::GetCommands,
            "collect_tests" => Command::CollectTests,
            "run" => Command::Run,
            "run_tests" => Command::RunTests,
            "run_analysis" => Command::RunAnalysis,
            "run_artifacts" => Command::RunArtifacts,
            "run_data" => Command::RunData,
            other => return Err(UnknownCommand(other.to_string())),
        })
    }
}

/// Server-side step status, carried as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum StepState {
    #[default]
    NotStarted,
    InProgress,
    Done,
    Error,
}

impl From<u8> for StepState {
    fn from(v: u8) -> Self {
        match v {
            1 => StepState::InProgress,
            2 => StepState::Done,
            3 => StepState::Error,
            _ => StepState::NotStarted,
        }
    }
}

impl From<StepState> for u8 {
    fn from(s: StepState) -> u8 {
        match s {
            StepState::NotStarted => 0,
            StepState::InProgress => 1,
            StepState::Done => 2,
            StepState::Error => 3,
        }
    }
}

/// Missing or malformed step field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("missing required step field '{0}'")]
    Missing(String),
    #[error("step field '{field}' is invalid: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_entry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    #[serde(default)]
    pub status: StepState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields_masked: Vec<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Step {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            index: 0,
            id: None,
            tool: tool.into(),
            tool_entry: None,
            tool_location: None,
            tool_version: None,
            status: StepState::NotStarted,
            result: None,
            fields_masked: Vec::new(),
            fields: Map::new(),
        }
    }

    /// Builder-style field insert, mostly for tests and fixtures.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    pub fn require_str(&self, key: &str) -> Result<&str, FieldError> {
        match self.field(key) {
            None => Err(FieldError::Missing(key.to_string())),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(FieldError::Invalid {
                field: key.to_string(),
                reason: "expected a string".to_string(),
            }),
        }
    }

    /// Deserialize an optional field into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, FieldError> {
        match self.field(key) {
            None => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
                FieldError::Invalid { field: key.to_string(), reason: e.to_string() }
            }),
        }
    }

    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, FieldError> {
        self.get(key)?.ok_or_else(|| FieldError::Missing(key.to_string()))
    }

    /// A field that may be given as a single string or a list of strings.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, FieldError> {
        match self.field(key) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(_) => self.require(key),
        }
    }

    pub fn bool_field(&self, key: &str) -> bool {
        self.field(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn cwd(&self) -> Option<&str> {
        self.str_field("cwd")
    }

    /// Explicit `timeout` in seconds, if the step sets one.
    pub fn timeout(&self) -> Option<Duration> {
        self.field("timeout").and_then(Value::as_f64).filter(|t| *t > 0.0).map(Duration::from_secs_f64)
    }

    pub fn timeout_or_default(&self) -> Duration {
        self.timeout().unwrap_or(DEFAULT_STEP_TIMEOUT)
    }

    pub fn attempts(&self) -> u32 {
        self.field("attempts").and_then(Value::as_u64).map(|a| a.max(1) as u32).unwrap_or(1)
    }

    pub fn sleep_after_attempt(&self) -> Duration {
        self.field("sleep_time_after_attempt")
            .and_then(Value::as_f64)
            .filter(|t| *t > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or_default()
    }

    /// Tests assigned to this step by the server (empty when unset).
    pub fn tests(&self) -> Vec<String> {
        self.get::<Vec<String>>("tests").ok().flatten().unwrap_or_default()
    }

    pub fn set_tests(&mut self, tests: Vec<String>) {
        self.set("tests", tests);
    }

    /// Step `env` map; non-string values are rendered as JSON text.
    pub fn env(&self) -> BTreeMap<String, String> {
        let Some(Value::Object(map)) = self.field("env") else {
            return BTreeMap::new();
        };
        map.iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect()
    }

    /// Values of every field named in `fields_masked`.
    pub fn masked_values(&self) -> Vec<String> {
        self.fields_masked
            .iter()
            .filter_map(|k| self.field(k))
            .filter_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::String(_) | Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect()
    }

    /// Name used in logs: `<id:N tool:name>`.
    pub fn label(&self) -> String {
        match self.id {
            Some(id) => format!("<id:{} tool:{}>", id, self.tool),
            None => format!("<idx:{} tool:{}>", self.index, self.tool),
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
