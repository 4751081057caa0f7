// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What the agent tells the dispatcher about its host.

use std::net::UdpSocket;
use std::path::Path;

use kk_wire::HostInfo;
use serde_json::Value;

pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Distribution id and version from an os-release file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: Option<String>,
    pub version_id: Option<String>,
}

pub fn parse_os_release(text: &str) -> OsRelease {
    let mut out = OsRelease::default();
    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
        if value.is_empty() {
            continue;
        }
        match key {
            "ID" => out.id = Some(value),
            "VERSION_ID" => out.version_id = Some(value),
            _ => {}
        }
    }
    out
}

/// `docker`, `lxc` or `bare-metal`, judged from files under `root`.
pub fn detect_isolation(root: &Path) -> &'static str {
    if root.join(".dockerenv").exists() {
        return "docker";
    }
    let environ = std::fs::read(root.join("proc/1/environ")).unwrap_or_default();
    let lxc = environ
        .split(|b| *b == 0)
        .any(|var| var.starts_with(b"container=lxc"));
    if lxc {
        "lxc"
    } else {
        "bare-metal"
    }
}

/// Collect host facts rooted at `root` (normally `/`).
pub fn host_info_at(root: &Path, system_id: Option<String>) -> HostInfo {
    let system_type = std::env::consts::OS.to_string();
    let release = match system_type.as_str() {
        "linux" => std::fs::read_to_string(root.join("etc/os-release"))
            .map(|t| parse_os_release(&t))
            .unwrap_or_default(),
        _ => OsRelease::default(),
    };

    let system = match (&system_id, &release.id) {
        (Some(id), _) if !id.is_empty() => id.clone(),
        (_, Some(distro)) => format!("{distro}-{}", release.version_id.as_deref().unwrap_or("")),
        _ => system_type.clone(),
    };

    let isolation = detect_isolation(root);
    let mut extra = serde_json::Map::new();
    let isolation_type = if isolation == "bare-metal" { "bare-metal" } else { "container" };
    extra.insert("isolation_type".to_string(), Value::from(isolation_type));

    HostInfo {
        hostname: hostname(root),
        system,
        system_type,
        distro_name: release.id,
        distro_version: release.version_id,
        isolation: Some(isolation.to_string()),
        system_id,
        agent_version: AGENT_VERSION.to_string(),
        extra,
    }
}

pub fn host_info(system_id: Option<String>) -> HostInfo {
    host_info_at(Path::new("/"), system_id)
}

fn hostname(root: &Path) -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| std::fs::read_to_string(root.join("etc/hostname")).ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Identity the agent presents to the dispatcher.
///
/// `agent.<slot>` for slotted services, `agent` for the in-process harness
/// mode, otherwise the local IP of the route towards the server.
pub fn my_address(server: &str) -> String {
    if let Some(slot) = crate::env::agent_slot() {
        return format!("agent.{slot}");
    }
    if crate::env::builtin_harness() {
        return "agent".to_string();
    }
    local_ip_towards(server).unwrap_or_else(|| "127.0.0.1".to_string())
}

/// Source address the kernel picks for `server`; nothing is sent.
pub fn local_ip_towards(server: &str) -> Option<String> {
    let host = server_host(server)?;
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect((host.as_str(), 1)).ok()?;
    socket.local_addr().ok().map(|a| a.ip().to_string())
}

/// Host part of an `http(s)://host[:port][/path]` URL.
pub fn server_host(server: &str) -> Option<String> {
    let rest = server.split_once("://").map(|(_, r)| r).unwrap_or(server);
    let authority = rest.split('/').next()?;
    let host = match authority.strip_prefix('[') {
        Some(v6) => v6.split(']').next()?,
        None => authority.rsplit_once(':').map(|(h, _)| h).unwrap_or(authority),
    };
    (!host.is_empty()).then(|| host.to_string())
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
