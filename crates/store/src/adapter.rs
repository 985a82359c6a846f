//! The Store Adapter interface.

use std::collections::HashMap;

use async_trait::async_trait;
use engine_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::item::{AttrValue, Item};

/// Secondary index on the events table keyed by `session_id`.
pub const SESSION_INDEX: &str = "session_index";

/// Attribute holding an absolute expiry time in ms.
pub const EXPIRES_AT: &str = "expires_at";

/// Scan predicate, evaluated per item.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanFilter {
    /// Integer attribute in `[low, high]`, inclusive
    Between { attr: String, low: i64, high: i64 },
    /// Attribute equal to a value, compared loosely
    Equals { attr: String, value: AttrValue },
    And(Vec<ScanFilter>),
}

impl ScanFilter {
    pub fn between(attr: &str, low: i64, high: i64) -> Self {
        Self::Between {
            attr: attr.to_string(),
            low,
            high,
        }
    }

    pub fn equals(attr: &str, value: impl Into<AttrValue>) -> Self {
        Self::Equals {
            attr: attr.to_string(),
            value: value.into(),
        }
    }

    pub fn and(self, other: ScanFilter) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Self::Between { attr, low, high } => item
                .get(attr)
                .and_then(AttrValue::as_i64)
                .map(|v| *low <= v && v <= *high)
                .unwrap_or(false),
            Self::Equals { attr, value } => item
                .get(attr)
                .map(|v| v.loosely_eq(value))
                .unwrap_or(false),
            Self::And(parts) => parts.iter().all(|p| p.matches(item)),
        }
    }
}

/// Key condition for index queries.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    pub attr: String,
    pub value: AttrValue,
}

impl KeyCondition {
    pub fn new(attr: &str, value: impl Into<AttrValue>) -> Self {
        Self {
            attr: attr.to_string(),
            value: value.into(),
        }
    }
}

/// Physical table names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub events: String,
    pub sessions: String,
    pub active_sessions: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            events: "events".to_string(),
            sessions: "sessions".to_string(),
            active_sessions: "active_sessions".to_string(),
        }
    }
}

/// Primary key attribute per table, plus secondary indexes.
#[derive(Debug, Clone, Default)]
pub struct KeySchema {
    primary: HashMap<String, String>,
    indexes: HashMap<(String, String), String>,
}

impl KeySchema {
    pub fn for_tables(tables: &TableNames) -> Self {
        let mut schema = Self::default();
        schema.primary.insert(tables.events.clone(), "event_id".into());
        schema.primary.insert(tables.sessions.clone(), "session_id".into());
        schema
            .primary
            .insert(tables.active_sessions.clone(), "session_id".into());
        schema.indexes.insert(
            (tables.events.clone(), SESSION_INDEX.to_string()),
            "session_id".into(),
        );
        schema
    }

    pub fn primary_key(&self, table: &str) -> Option<&str> {
        self.primary.get(table).map(String::as_str)
    }

    pub fn index_attr(&self, table: &str, index: &str) -> Option<&str> {
        self.indexes
            .get(&(table.to_string(), index.to_string()))
            .map(String::as_str)
    }

    /// Render the primary key of `item` in `table`.
    pub fn key_of(&self, table: &str, item: &Item) -> Result<String> {
        let attr = self
            .primary_key(table)
            .ok_or_else(|| Error::store(format!("unknown table '{}'", table)))?;
        item.get(attr)
            .map(ToString::to_string)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::malformed_record(format!("item in '{}' lacks key '{}'", table, attr)))
    }

    /// Check that `index` exists on `table` and is keyed by `condition.attr`.
    pub fn check_index(&self, table: &str, index: &str, condition: &KeyCondition) -> Result<()> {
        match self.index_attr(table, index) {
            Some(attr) if attr == condition.attr => Ok(()),
            Some(attr) => Err(Error::store(format!(
                "index '{}' on '{}' is keyed by '{}', not '{}'",
                index, table, attr, condition.attr
            ))),
            None => Err(Error::store(format!("unknown index '{}' on '{}'", index, table))),
        }
    }
}

/// Abstract persistence used by the session manager and the dashboard.
///
/// `scan` returns items in the backend's write order, oldest first. When
/// `limit` caps the result, the most recently written matches are kept.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace an item by primary key.
    async fn put(&self, table: &str, item: Item) -> Result<()>;

    async fn get(&self, table: &str, key: &Item) -> Result<Option<Item>>;

    async fn scan(
        &self,
        table: &str,
        filter: Option<&ScanFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Item>>;

    async fn query(&self, table: &str, index: &str, condition: &KeyCondition) -> Result<Vec<Item>>;

    /// Delete items whose `attr` is at or before `now_ms`. Returns the count removed.
    async fn purge_expired(&self, _table: &str, _attr: &str, _now_ms: i64) -> Result<u64> {
        Ok(0)
    }

    /// Connectivity check.
    async fn ping(&self) -> Result<()>;

    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;
}
