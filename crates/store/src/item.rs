//! Loosely-typed items crossing the storage boundary.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single attribute value: string, integer or boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    B(bool),
    N(i64),
    S(String),
}

/// An item is an attribute map.
pub type Item = BTreeMap<String, AttrValue>;

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view. Numeric strings are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::N(n) => Some(*n),
            Self::S(s) => s.trim().parse().ok(),
            Self::B(_) => None,
        }
    }

    /// Boolean view. `"true"` and `"false"` are accepted.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::B(b) => Some(*b),
            Self::S(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Self::S(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Equality that treats `N(5)` and `S("5")` as the same value.
    pub fn loosely_eq(&self, other: &AttrValue) -> bool {
        if self == other {
            return true;
        }
        match (self.as_i64(), other.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => match (self.as_bool(), other.as_bool()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::B(b) => write!(f, "{}", b),
            Self::N(n) => write!(f, "{}", n),
            Self::S(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::N(value)
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        Self::N(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::B(value)
    }
}

/// Build a single-attribute key item.
pub fn key_item(attr: &str, value: impl Into<AttrValue>) -> Item {
    let mut item = Item::new();
    item.insert(attr.to_string(), value.into());
    item
}
