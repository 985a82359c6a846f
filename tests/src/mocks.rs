//! Mock implementations for testing.

use async_trait::async_trait;
use engine_core::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use store::{Item, KeyCondition, MemoryStore, ScanFilter, Store};

/// Store wrapper that fails reads or writes on chosen tables.
///
/// Delegates to a [`MemoryStore`], so everything that succeeds is really
/// stored and visible to later requests.
#[derive(Clone)]
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing_reads: Arc<Mutex<HashSet<String>>>,
    failing_writes: Arc<Mutex<HashSet<String>>>,
    writes: Arc<Mutex<Vec<String>>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing_reads: Arc::new(Mutex::new(HashSet::new())),
            failing_writes: Arc::new(Mutex::new(HashSet::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Fail every read of `table` (gets, scans and queries).
    pub fn fail_reads(&self, table: &str, fail: bool) {
        toggle(&self.failing_reads, table, fail);
    }

    /// Fail every write to `table`.
    pub fn fail_writes(&self, table: &str, fail: bool) {
        toggle(&self.failing_writes, table, fail);
    }

    /// Tables written to, in call order, including failed writes.
    pub fn write_log(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    fn check_read(&self, table: &str) -> Result<()> {
        if self.failing_reads.lock().contains(table) {
            return Err(Error::store(format!("mock read failure on {}", table)));
        }
        Ok(())
    }

    fn check_write(&self, table: &str) -> Result<()> {
        self.writes.lock().push(table.to_string());
        if self.failing_writes.lock().contains(table) {
            return Err(Error::store(format!("mock write failure on {}", table)));
        }
        Ok(())
    }
}

fn toggle(set: &Mutex<HashSet<String>>, table: &str, on: bool) {
    let mut set = set.lock();
    if on {
        set.insert(table.to_string());
    } else {
        set.remove(table);
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn put(&self, table: &str, item: Item) -> Result<()> {
        self.check_write(table)?;
        self.inner.put(table, item).await
    }

    async fn get(&self, table: &str, key: &Item) -> Result<Option<Item>> {
        self.check_read(table)?;
        self.inner.get(table, key).await
    }

    async fn scan(
        &self,
        table: &str,
        filter: Option<&ScanFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Item>> {
        self.check_read(table)?;
        self.inner.scan(table, filter, limit).await
    }

    async fn query(&self, table: &str, index: &str, condition: &KeyCondition) -> Result<Vec<Item>> {
        self.check_read(table)?;
        self.inner.query(table, index, condition).await
    }

    async fn purge_expired(&self, table: &str, attr: &str, now_ms: i64) -> Result<u64> {
        self.check_write(table)?;
        self.inner.purge_expired(table, attr, now_ms).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }

    fn backend(&self) -> &'static str {
        "flaky-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{key_item, TableNames};

    #[tokio::test]
    async fn test_failures_are_per_table() {
        let store = FlakyStore::new(Arc::new(MemoryStore::new(&TableNames::default())));
        store.fail_writes("sessions", true);

        assert!(store.put("sessions", key_item("session_id", "s1")).await.is_err());
        assert!(store.put("events", key_item("event_id", "e1")).await.is_ok());
        assert_eq!(store.write_log(), vec!["sessions", "events"]);

        store.fail_reads("events", true);
        assert!(store.get("events", &key_item("event_id", "e1")).await.is_err());
        store.fail_reads("events", false);
        assert!(store.get("events", &key_item("event_id", "e1")).await.unwrap().is_some());
    }
}
