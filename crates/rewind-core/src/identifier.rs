//! Entity identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Separator placed between identifier values when building a key.
pub const KEY_SEPARATOR: char = '|';

const KEY_ESCAPE: char = '\\';
const NULL_MARKER: &str = "\\N";

/// Primary-key value(s) of an entity, in the metadata's declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier(Vec<Value>);

impl Identifier {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Identifier of a single-column primary key.
    #[must_use]
    pub fn single(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any component is `NULL`.
    #[must_use]
    pub fn has_null(&self) -> bool {
        self.0.iter().any(Value::is_null)
    }

    /// Flat string key: the values joined with [`KEY_SEPARATOR`].
    ///
    /// Separators and backslashes inside a value are backslash-escaped and
    /// `NULL` is written as `\N`, so distinct identifiers never share a key.
    #[must_use]
    pub fn key(&self) -> String {
        let mut key = String::new();
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                key.push(KEY_SEPARATOR);
            }
            if value.is_null() {
                key.push_str(NULL_MARKER);
                continue;
            }
            for ch in value.to_string().chars() {
                if ch == KEY_SEPARATOR || ch == KEY_ESCAPE {
                    key.push(KEY_ESCAPE);
                }
                key.push(ch);
            }
        }
        key
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<i64> for Identifier {
    fn from(n: i64) -> Self {
        Self::single(n)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::single(s)
    }
}

impl From<Vec<Value>> for Identifier {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}
