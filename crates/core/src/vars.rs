// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `$VAR` / `${VAR}` / `~` expansion for step paths and environments.

fn is_name_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Expand variables in `input` using `lookup`.
///
/// Unknown variables are left as written, `$$` is a literal `$`, an
/// unterminated `${` is kept verbatim, and `~` is expanded only at the very
/// start when followed by `/` or the end of input.
pub fn expand(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    if rest == "~" || rest.starts_with("~/") {
        if let Some(home) = lookup("HOME") {
            out.push_str(&home);
            rest = &rest[1..];
        }
    }

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => {
                    match lookup(&braced[..end]) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&rest[pos..pos + end + 3]),
                    }
                    rest = &braced[end + 1..];
                }
                None => {
                    out.push_str(&rest[pos..]);
                    rest = "";
                }
            }
        } else if after.starts_with(|c: char| c == '_' || c.is_ascii_alphabetic()) {
            let len = after.find(|c: char| !is_name_char(c)).unwrap_or(after.len());
            match lookup(&after[..len]) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[pos..pos + len + 1]),
            }
            rest = &after[len..];
        } else {
            out.push('$');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
