// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ExecOptions;

#[yare::parameterized(
    plain = { "/usr/bin/kktool", "/usr/bin/kktool" },
    addr = { "127.0.0.1:4242", "127.0.0.1:4242" },
    space = { "/tmp/my dir/step.json", "'/tmp/my dir/step.json'" },
    quote_char = { "it's", r"'it'\''s'" },
    glob = { "*.min.js", "'*.min.js'" },
    empty = { "", "''" },
)]
fn quotes_for_shell(input: &str, expected: &str) {
    assert_eq!(quote(input), expected);
}

#[tokio::test]
async fn quoted_word_reaches_the_command_intact() {
    let hostile = "a'; echo injected; '";
    let ran = crate::run(&format!("printf '%s' {}", quote(hostile)), &ExecOptions::default()).await.unwrap();
    assert_eq!(ran.output, hostile);
}
