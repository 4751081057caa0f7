// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kk_core::Job;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dispatcher reply. Every field is optional; `{}` means "nothing for you".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
    /// Configuration changes to merge into the agent's settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg: Option<Map<String, Value>>,
    #[serde(default)]
    pub cancel: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<u64>,
    #[serde(default)]
    pub unauthorized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Response {
    /// Parse a reply body.
    ///
    /// `job` may be an empty object (no work), and a bare job document at
    /// the top level is accepted as well.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let mut value: Value = serde_json::from_slice(body)?;
        if let Some(obj) = value.as_object_mut() {
            if matches!(obj.get("job"), Some(Value::Null))
                || matches!(obj.get("job"), Some(Value::Object(j)) if j.is_empty())
            {
                obj.remove("job");
            }
            if !obj.contains_key("job") && obj.contains_key("id") && obj.contains_key("steps") {
                let job = serde_json::from_value(Value::Object(std::mem::take(obj)))?;
                return Ok(Self { job: Some(job), ..Self::default() });
            }
        }
        serde_json::from_value(value)
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
