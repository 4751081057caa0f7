// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret masking for everything that leaves the process as a log line.
//!
//! Matching is literal. The position selects which occurrences are masked:
//!
//! - `middle`: every occurrence anywhere in the text
//! - `start`: an occurrence that opens a line
//! - `end`: an occurrence that closes a line
//!
//! Anchored positions exist for secrets that span lines: such a secret is
//! registered line by line, its first line as `end` (it closes the log line
//! it starts on), its last line as `start`, the lines in between as `middle`.

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Replacement for a masked secret.
pub const MASK: &str = "******";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretPosition {
    Start,
    #[default]
    Middle,
    End,
}

crate::simple_display! {
    SecretPosition {
        Start => "start",
        Middle => "middle",
        End => "end",
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown secret position: {0}")]
pub struct UnknownPosition(pub String);

impl FromStr for SecretPosition {
    type Err = UnknownPosition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(SecretPosition::Start),
            "middle" => Ok(SecretPosition::Middle),
            "end" => Ok(SecretPosition::End),
            other => Err(UnknownPosition(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Secret {
    value: String,
    position: SecretPosition,
}

/// Mask one secret in `text`.
pub fn mask_secret<'a>(text: &'a str, secret: &str, position: SecretPosition) -> Cow<'a, str> {
    if secret.is_empty() || !text.contains(secret) {
        return Cow::Borrowed(text);
    }
    match position {
        SecretPosition::Middle => Cow::Owned(text.replace(secret, MASK)),
        SecretPosition::Start | SecretPosition::End => {
            let mut out = String::with_capacity(text.len());
            for (i, line) in text.split('\n').enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                match position {
                    SecretPosition::Start if line.starts_with(secret) => {
                        out.push_str(MASK);
                        out.push_str(&line[secret.len()..]);
                    }
                    SecretPosition::End if line.ends_with(secret) => {
                        out.push_str(&line[..line.len() - secret.len()]);
                        out.push_str(MASK);
                    }
                    _ => out.push_str(line),
                }
            }
            Cow::Owned(out)
        }
    }
}

/// Shared list of registered secrets.
///
/// Cloning shares the list. Reads take a short read lock and never hold it
/// while writing output.
#[derive(Clone, Default)]
pub struct MaskRegistry {
    secrets: Arc<RwLock<Vec<Secret>>>,
}

impl std::fmt::Debug for MaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskRegistry").field("len", &self.len()).finish()
    }
}

impl MaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret. Secrets spanning several lines are split.
    pub fn add_mask_secret(&self, secret: &str, position: SecretPosition) {
        let secret = secret.trim_end_matches(['\r', '\n']);
        if secret.trim().is_empty() {
            return;
        }
        let lines: Vec<&str> = secret.split('\n').map(|l| l.trim_end_matches('\r')).collect();
        let mut secrets = self.secrets.write();
        let mut push = |value: &str, position| {
            if value.is_empty() {
                return;
            }
            let entry = Secret { value: value.to_string(), position };
            if !secrets.contains(&entry) {
                secrets.push(entry);
            }
        };
        if lines.len() == 1 {
            push(lines[0], position);
        } else {
            let last = lines.len() - 1;
            for (i, line) in lines.iter().enumerate() {
                let pos = match i {
                    0 => SecretPosition::End,
                    i if i == last => SecretPosition::Start,
                    _ => SecretPosition::Middle,
                };
                push(line, pos);
            }
        }
        // Longer secrets first so a secret containing another is masked whole.
        secrets.sort_by(|a, b| b.value.len().cmp(&a.value.len()));
    }

    /// Register a value masked wherever it appears.
    pub fn add(&self, secret: &str) {
        self.add_mask_secret(secret, SecretPosition::Middle);
    }

    pub fn clear(&self) {
        self.secrets.write().clear();
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mask<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let secrets = self.secrets.read();
        let mut out = Cow::Borrowed(text);
        for s in secrets.iter() {
            let masked = match mask_secret(&out, &s.value, s.position) {
                Cow::Owned(m) => Some(m),
                Cow::Borrowed(_) => None,
            };
            if let Some(m) = masked {
                out = Cow::Owned(m);
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "mask_tests.rs"]
mod tests;
