// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration: command line, optional TOML file, defaults.
//!
//! Precedence is CLI (including its env fallbacks) > file > defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use kk_core::Settings;
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "kkagent", version, about = "Kraken CI agent")]
pub struct Cli {
    /// Dispatcher base URL, e.g. http://kraken:8080
    #[arg(long, env = "KRAKEN_SERVER_ADDR")]
    pub server: Option<String>,

    /// Directory for job workdirs, tool packages and local logs
    #[arg(long, env = "KRAKEN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Extra directories searched for tool packages, comma separated
    #[arg(long, env = "KRAKEN_TOOLS_DIRS", value_delimiter = ',')]
    pub tools_dirs: Vec<PathBuf>,

    /// UDP log proxy, host[:port]
    #[arg(long, env = "KRAKEN_CLICKHOUSE_ADDR")]
    pub clickhouse_addr: Option<String>,

    #[arg(long, env = "KRAKEN_SYSTEM_ID")]
    pub system_id: Option<String>,

    /// Exit after the first job
    #[arg(long)]
    pub one_job: bool,

    /// TOML file with the same keys plus a [vars] table
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// On-disk configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub server: Option<String>,
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub tools_dirs: Vec<PathBuf>,
    pub clickhouse_addr: Option<String>,
    pub system_id: Option<String>,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

/// Resolved agent configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub server: String,
    pub data_dir: PathBuf,
    pub tools_dirs: Vec<PathBuf>,
    pub clickhouse_addr: Option<String>,
    pub system_id: Option<String>,
    pub one_job: bool,
    pub vars: BTreeMap<String, String>,
}

impl AgentConfig {
    pub fn load(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let server = cli.server.or(file.server).ok_or(ConfigError::MissingServer)?;
        let server = server.trim_end_matches('/').to_string();
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(ConfigError::BadServer(server));
        }
        let tools_dirs = if cli.tools_dirs.is_empty() { file.tools_dirs } else { cli.tools_dirs };
        Ok(Self {
            server,
            data_dir: cli.data_dir.or(file.data_dir).unwrap_or_else(crate::env::default_data_dir),
            tools_dirs,
            clickhouse_addr: cli.clickhouse_addr.or(file.clickhouse_addr),
            system_id: cli.system_id.or(file.system_id),
            one_job: cli.one_job,
            vars: file.vars,
        })
    }

    /// Initial runtime settings for the agent [`kk_core::Context`].
    pub fn settings(&self) -> Settings {
        Settings {
            server: Some(self.server.clone()),
            data_dir: self.data_dir.clone(),
            tools_dirs: self.tools_dirs.clone(),
            clickhouse_addr: self.clickhouse_addr.clone(),
            minio_addr: crate::env::minio_addr(),
            system_id: self.system_id.clone(),
            vars: self.vars.clone(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
