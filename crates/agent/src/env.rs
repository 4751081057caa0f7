// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent crate.

use std::path::PathBuf;

/// Object-store address that overrides the one carried by transfer steps.
pub fn minio_addr() -> Option<String> {
    non_empty("KRAKEN_MINIO_ADDR")
}

/// Credentials for fetching tool packages from the object store.
pub fn minio_access_key() -> Option<String> {
    non_empty("MINIO_ACCESS_KEY")
}

pub fn minio_secret_key() -> Option<String> {
    non_empty("MINIO_SECRET_KEY")
}

/// Run tools in-process instead of spawning the harness binary.
pub fn builtin_harness() -> bool {
    std::env::var_os("KRAKEN_AGENT_BUILTIN").is_some()
}

/// Slot name when running as a replicated service; the agent then
/// identifies itself as `agent.<slot>`.
pub fn agent_slot() -> Option<String> {
    non_empty("KRAKEN_AGENT_SLOT")
}

/// Default UDP port of the log proxy when the address carries none.
pub fn clickhouse_port() -> Option<u16> {
    std::env::var("KRAKEN_CLICKHOUSE_PORT").ok().and_then(|s| s.parse::<u16>().ok())
}

/// Harness binary: KRAKEN_TOOL_BIN > `kktool` next to this executable >
/// `kktool` on PATH.
pub fn tool_bin() -> PathBuf {
    if let Some(bin) = non_empty("KRAKEN_TOOL_BIN") {
        return PathBuf::from(bin);
    }
    let sibling = std::env::current_exe().ok().and_then(|exe| exe.parent().map(|d| d.join("kktool")));
    match sibling {
        Some(path) if path.exists() => path,
        _ => PathBuf::from("kktool"),
    }
}

/// Default data directory: `<data_local_dir>/kraken`, else `/tmp/kraken`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir().map(|d| d.join("kraken")).unwrap_or_else(|| PathBuf::from("/tmp/kraken"))
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}
