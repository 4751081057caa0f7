// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kkagent` startup: flags and configuration errors.

use crate::prelude::*;

#[test]
fn help_lists_the_flags() {
    kkagent()
        .args(&["--help"])
        .passes()
        .stdout_has("--server")
        .stdout_has("--data-dir")
        .stdout_has("--one-job");
}

#[test]
fn version_is_printed() {
    kkagent().args(&["--version"]).passes().stdout_has("kkagent");
}

#[test]
fn missing_server_is_fatal() {
    kkagent().env_remove("KRAKEN_SERVER_ADDR").fails().stderr_has("server");
}

#[test]
fn non_http_server_is_fatal() {
    kkagent().args(&["--server", "ftp://kraken"]).fails().stderr_has("ftp://kraken");
}

#[test]
fn unknown_config_key_is_fatal() {
    let work = Workdir::new();
    let config = work.path().join("agent.toml");
    std::fs::write(&config, "server = \"http://kraken:8080\"\nbogus = 1\n").unwrap();

    kkagent().arg("--config").arg(&config).env_remove("KRAKEN_SERVER_ADDR").fails().stderr_has("bogus");
}
