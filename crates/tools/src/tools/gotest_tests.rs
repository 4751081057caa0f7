// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    pass = { r#"{"Action":"pass","Package":"example.com/m","Test":"TestA","Elapsed":0.1}"#, "example.com/m::TestA", 1 },
    fail = { r#"{"Action":"fail","Package":"example.com/m","Test":"TestB"}"#, "example.com/m::TestB", 2 },
    skip = { r#"{"Action":"skip","Package":"example.com/m","Test":"TestC"}"#, "example.com/m::TestC", 4 },
    no_package = { r#"{"Action":"pass","Test":"TestD"}"#, "TestD", 1 },
)]
fn finished_tests(line: &str, test: &str, status: u8) {
    let result = parse_event(line).unwrap();
    assert_eq!(result.test, test);
    assert_eq!(u8::from(result.status), status);
}

#[yare::parameterized(
    empty = { "" },
    run = { r#"{"Action":"run","Package":"example.com/m","Test":"TestA"}"# },
    output = { r#"{"Action":"output","Package":"example.com/m","Output":"ok\n"}"# },
    package_pass = { r#"{"Action":"pass","Package":"example.com/m"}"# },
    not_json = { "# example.com/m [build failed]" },
)]
fn other_lines_are_ignored(line: &str) {
    assert!(parse_event(line).is_none());
}
