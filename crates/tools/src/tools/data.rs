// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use kk_core::{Command, Context, Step};
use serde_json::Value;

use super::work_dir;
use crate::{Collector, Outcome, Tool, ToolError};

/// Streams a file's contents as a `data` record.
///
/// JSON content is sent as parsed JSON, anything else as a string. With
/// `value` set, an empty record is sent instead.
pub struct Data;

#[async_trait]
impl Tool for Data {
    fn name(&self) -> &'static str {
        "data"
    }

    fn commands(&self) -> &'static [Command] {
        &[Command::RunData]
    }

    async fn run_data(
        &self,
        cx: &Context,
        step: &Step,
        out: &mut Collector<'_, Value>,
    ) -> Result<Outcome, ToolError> {
        if step.field("value").is_some_and(truthy) {
            out.report(Value::String(String::new())).await?;
            return Ok(Outcome::ok());
        }
        let Some(file) = step.str_field("file").filter(|f| !f.is_empty()) else {
            tracing::error!("missing file path in step definition");
            return Ok(Outcome::failed(1, "missing file path in step definition"));
        };

        let path = work_dir(cx, step)?.join(file);
        if !path.exists() {
            let msg = format!("missing file path at {}", path.display());
            tracing::error!(%msg);
            return Ok(Outcome::failed(1, msg));
        }
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) => {
                let msg = format!("problem with reading file {}: {e}", path.display());
                tracing::error!(%msg);
                return Ok(Outcome::failed(1, msg));
            }
        };
        let record = serde_json::from_str(&text).unwrap_or(Value::String(text));
        out.report(record).await?;
        Ok(Outcome::ok())
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
