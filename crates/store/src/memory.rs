//! In-process store backend.
//!
//! Tables keep first-write order; replacing an item keeps its position.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use engine_core::{Error, Result};
use parking_lot::RwLock;

use crate::adapter::{KeyCondition, KeySchema, ScanFilter, Store, TableNames};
use crate::item::{AttrValue, Item};

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Item>,
    by_key: HashMap<String, usize>,
}

impl Table {
    fn upsert(&mut self, key: String, item: Item) {
        match self.by_key.get(&key) {
            Some(&pos) => self.rows[pos] = item,
            None => {
                self.by_key.insert(key, self.rows.len());
                self.rows.push(item);
            }
        }
    }
}

/// In-memory [`Store`] with failure injection for tests.
pub struct MemoryStore {
    schema: KeySchema,
    tables: RwLock<HashMap<String, Table>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(tables: &TableNames) -> Self {
        Self {
            schema: KeySchema::for_tables(tables),
            tables: RwLock::new(HashMap::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every read fail with `StoreUnavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with `StoreUnavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of items in `table`.
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::store("memory store: reads disabled"));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::store("memory store: writes disabled"));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, table: &str, item: Item) -> Result<()> {
        self.check_writes()?;
        let key = self.schema.key_of(table, &item)?;
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .upsert(key, item);
        Ok(())
    }

    async fn get(&self, table: &str, key: &Item) -> Result<Option<Item>> {
        self.check_reads()?;
        let key = self.schema.key_of(table, key)?;
        let tables = self.tables.read();
        Ok(tables
            .get(table)
            .and_then(|t| t.by_key.get(&key).map(|&pos| t.rows[pos].clone())))
    }

    async fn scan(
        &self,
        table: &str,
        filter: Option<&ScanFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Item>> {
        self.check_reads()?;
        let tables = self.tables.read();
        let Some(t) = tables.get(table) else {
            return Ok(Vec::new());
        };
        let mut items: Vec<Item> = t
            .rows
            .iter()
            .rev()
            .filter(|item| filter.map_or(true, |f| f.matches(item)))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        items.reverse();
        Ok(items)
    }

    async fn query(&self, table: &str, index: &str, condition: &KeyCondition) -> Result<Vec<Item>> {
        self.check_reads()?;
        self.schema.check_index(table, index, condition)?;
        let tables = self.tables.read();
        Ok(tables
            .get(table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|item| {
                        item.get(&condition.attr)
                            .map_or(false, |v| v.loosely_eq(&condition.value))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn purge_expired(&self, table: &str, attr: &str, now_ms: i64) -> Result<u64> {
        self.check_writes()?;
        let mut tables = self.tables.write();
        let Some(t) = tables.get_mut(table) else {
            return Ok(0);
        };

        let before = t.rows.len();
        t.rows.retain(|item| {
            item.get(attr)
                .and_then(AttrValue::as_i64)
                .map_or(true, |expiry| expiry > now_ms)
        });
        let removed = before - t.rows.len();

        if removed > 0 {
            let schema = &self.schema;
            t.by_key = t
                .rows
                .iter()
                .enumerate()
                .filter_map(|(pos, item)| schema.key_of(table, item).ok().map(|k| (k, pos)))
                .collect();
        }
        Ok(removed as u64)
    }

    async fn ping(&self) -> Result<()> {
        self.check_reads()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
