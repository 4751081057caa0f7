// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ToolError;
use crate::tool::Tool;
use crate::tools;

/// Tools addressable by name.
#[derive(Clone, Default)]
pub struct Registry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tool shipped with the agent.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(tools::Artifacts);
        registry.register(tools::Cache);
        registry.register(tools::Cloc);
        registry.register(tools::Data);
        registry.register(tools::Git);
        registry.register(tools::GoTest);
        registry.register(tools::JunitCollect);
        registry.register(tools::NgLint);
        registry.register(tools::PyLint);
        registry.register(tools::PyTest);
        registry.register(tools::RndTest);
        registry.register(tools::Shell);
        registry.register(tools::ValuesCollect);
        registry
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools.get(name).cloned().ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.keys().copied()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
