// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn lookup(name: &str) -> Option<String> {
    match name {
        "HOME" => Some("/home/kk".into()),
        "BUILD" => Some("out".into()),
        "V_2" => Some("two".into()),
        _ => None,
    }
}

#[yare::parameterized(
    plain = { "no vars", "no vars" },
    braced = { "${BUILD}/bin", "out/bin" },
    bare = { "$BUILD/bin", "out/bin" },
    underscore_digits = { "x$V_2.y", "xtwo.y" },
    unknown_braced = { "a${NOPE}b", "a${NOPE}b" },
    unknown_bare = { "$BUILD_DIR/out", "$BUILD_DIR/out" },
    unknown_then_known = { "$NOPE/$BUILD", "$NOPE/out" },
    dollar_dollar = { "cost $$5", "cost $5" },
    lone_dollar = { "5$ and $", "5$ and $" },
    unterminated = { "a${BUILD", "a${BUILD" },
    tilde = { "~/.cache", "/home/kk/.cache" },
    tilde_alone = { "~", "/home/kk" },
    tilde_user = { "~bob/x", "~bob/x" },
    tilde_inner = { "a/~/b", "a/~/b" },
)]
fn expands(input: &str, expected: &str) {
    assert_eq!(expand(input, lookup), expected);
}
