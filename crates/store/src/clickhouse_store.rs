//! ClickHouse store backend.
//!
//! Items are stored as JSON bodies in a single `ReplacingMergeTree` table.
//! Reads use `FINAL` so only the newest version of each key is visible.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use clickhouse::{Client, Row};
use engine_core::{Error, Result};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::{debug, error, info};

use crate::adapter::{KeyCondition, KeySchema, ScanFilter, Store, TableNames};
use crate::config::ClickHouseConfig;
use crate::item::{AttrValue, Item};
use crate::schema::all_statements;

#[derive(Debug, Clone, Row, Serialize)]
struct ItemRow {
    table_name: String,
    item_key: String,
    body: String,
    version: u64,
}

#[derive(Debug, Clone, Row, Deserialize)]
struct BodyRow {
    body: String,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
enum Param {
    Str(String),
    Int(i64),
    Bool(u8),
}

/// Integer attribute of `body`, read from a JSON number or a numeric string.
const INT_ATTR: &str = "toInt64OrZero(trim(BOTH '\"' FROM JSONExtractRaw(body, ?)))";

/// Translate a scan filter into a SQL predicate over `body`.
fn filter_sql(filter: &ScanFilter, params: &mut Vec<Param>) -> String {
    match filter {
        ScanFilter::Between { attr, low, high } => {
            params.push(Param::Str(attr.clone()));
            params.push(Param::Str(attr.clone()));
            params.push(Param::Int(*low));
            params.push(Param::Int(*high));
            format!("JSONHas(body, ?) AND {} BETWEEN ? AND ?", INT_ATTR)
        }
        ScanFilter::Equals { attr, value } => {
            params.push(Param::Str(attr.clone()));
            match value {
                AttrValue::S(s) => {
                    params.push(Param::Str(s.clone()));
                    "JSONExtractString(body, ?) = ?".to_string()
                }
                AttrValue::N(n) => {
                    params.push(Param::Int(*n));
                    format!("{} = ?", INT_ATTR)
                }
                AttrValue::B(b) => {
                    params.push(Param::Bool(u8::from(*b)));
                    "JSONExtractBool(body, ?) = ?".to_string()
                }
            }
        }
        ScanFilter::And(parts) if parts.is_empty() => "1".to_string(),
        ScanFilter::And(parts) => parts
            .iter()
            .map(|p| format!("({})", filter_sql(p, params)))
            .collect::<Vec<_>>()
            .join(" AND "),
    }
}

/// Scan query in write order. A limit keeps the newest matching versions.
fn scan_sql(table: &str, filter: Option<&ScanFilter>, limit: Option<usize>) -> (String, Vec<Param>) {
    let mut params = vec![Param::Str(table.to_string())];
    let mut predicate = "table_name = ?".to_string();
    if let Some(filter) = filter {
        predicate.push_str(" AND (");
        predicate.push_str(&filter_sql(filter, &mut params));
        predicate.push(')');
    }

    let sql = match limit {
        Some(limit) => {
            params.push(Param::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
            format!(
                "SELECT body FROM (SELECT body, version FROM items FINAL WHERE {} \
                 ORDER BY version DESC LIMIT ?) ORDER BY version",
                predicate
            )
        }
        None => format!("SELECT body FROM items FINAL WHERE {} ORDER BY version", predicate),
    };
    (sql, params)
}

/// [`Store`] backed by ClickHouse.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: Client,
    admin: Client,
    config: ClickHouseConfig,
    schema: KeySchema,
    version: std::sync::Arc<AtomicU64>,
}

impl ClickHouseStore {
    /// Creates a new ClickHouse store. Does not touch the network.
    pub fn new(config: ClickHouseConfig, tables: &TableNames) -> Self {
        let mut admin = Client::default().with_url(&config.url);

        if let Some(ref user) = config.username {
            admin = admin.with_user(user);
        }

        if let Some(ref pass) = config.password {
            admin = admin.with_password(pass);
        }

        let client = admin.clone().with_database(&config.database);

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse store"
        );

        Self {
            client,
            admin,
            config,
            schema: KeySchema::for_tables(tables),
            version: std::sync::Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create the database and items table if missing.
    pub async fn init_schema(&self) -> Result<()> {
        for ddl in all_statements(&self.config.database) {
            self.timed(self.admin.query(&ddl).execute())
                .await
                .map_err(|e| Error::store(format!("failed to execute DDL: {}", e)))?;
        }
        debug!("ClickHouse schema initialized");
        Ok(())
    }

    /// Remove every item of a logical table. Used by tests.
    pub async fn truncate(&self, table: &str) -> Result<()> {
        self.timed(
            self.client
                .query("ALTER TABLE items DELETE WHERE table_name = ? SETTINGS mutations_sync = 1")
                .bind(table)
                .execute(),
        )
        .await
    }

    /// Strictly increasing write version, seeded from the wall clock.
    fn next_version(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        let mut current = self.version.load(Ordering::SeqCst);
        loop {
            let next = now.max(current + 1);
            match self
                .version
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Run a ClickHouse call under the configured timeout, recording latency.
    async fn timed<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = clickhouse::error::Result<T>>,
    {
        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.timeout_secs.max(1));
        let result = match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::store(format!("clickhouse: {}", e))),
            Err(_) => Err(Error::store(format!(
                "clickhouse: timed out after {}s",
                timeout.as_secs()
            ))),
        };
        metrics()
            .store_latency_ms
            .observe(start.elapsed().as_millis() as u64);
        if let Err(ref e) = result {
            metrics().store_errors.inc();
            error!(error = %e, "ClickHouse operation failed");
        }
        result
    }

    async fn fetch_bodies(&self, sql: &str, params: Vec<Param>) -> Result<Vec<Item>> {
        let mut query = self.client.query(sql);
        for param in params {
            query = match param {
                Param::Str(s) => query.bind(s),
                Param::Int(n) => query.bind(n),
                Param::Bool(b) => query.bind(b),
            };
        }
        let rows: Vec<BodyRow> = self.timed(query.fetch_all()).await?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_str::<Item>(&row.body)
                    .map_err(|e| Error::malformed_record(format!("undecodable item body: {}", e)))
            })
            .collect()
    }
}

#[async_trait]
impl Store for ClickHouseStore {
    async fn put(&self, table: &str, item: Item) -> Result<()> {
        let row = ItemRow {
            table_name: table.to_string(),
            item_key: self.schema.key_of(table, &item)?,
            body: serde_json::to_string(&item)?,
            version: self.next_version(),
        };

        let mut insert = self
            .client
            .insert("items")
            .map_err(|e| Error::store(format!("insert error: {}", e)))?;
        self.timed(insert.write(&row)).await?;
        self.timed(insert.end()).await
    }

    async fn get(&self, table: &str, key: &Item) -> Result<Option<Item>> {
        let item_key = self.schema.key_of(table, key)?;
        let items = self
            .fetch_bodies(
                "SELECT body FROM items FINAL WHERE table_name = ? AND item_key = ? LIMIT 1",
                vec![Param::Str(table.to_string()), Param::Str(item_key)],
            )
            .await?;
        Ok(items.into_iter().next())
    }

    async fn scan(
        &self,
        table: &str,
        filter: Option<&ScanFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Item>> {
        let (sql, params) = scan_sql(table, filter, limit);
        self.fetch_bodies(&sql, params).await
    }

    async fn query(&self, table: &str, index: &str, condition: &KeyCondition) -> Result<Vec<Item>> {
        self.schema.check_index(table, index, condition)?;
        let filter = ScanFilter::Equals {
            attr: condition.attr.clone(),
            value: condition.value.clone(),
        };
        self.scan(table, Some(&filter), None).await
    }

    async fn purge_expired(&self, table: &str, attr: &str, now_ms: i64) -> Result<u64> {
        let predicate = format!("table_name = ? AND JSONHas(body, ?) AND {} <= ?", INT_ATTR);

        let count: u64 = self
            .timed(
                self.client
                    .query(&format!("SELECT count() FROM items FINAL WHERE {}", predicate))
                    .bind(table)
                    .bind(attr)
                    .bind(attr)
                    .bind(now_ms)
                    .fetch_one(),
            )
            .await?;

        if count > 0 {
            self.timed(
                self.client
                    .query(&format!("ALTER TABLE items DELETE WHERE {}", predicate))
                    .bind(table)
                    .bind(attr)
                    .bind(attr)
                    .bind(now_ms)
                    .execute(),
            )
            .await?;
        }
        Ok(count)
    }

    async fn ping(&self) -> Result<()> {
        let one: u8 = self.timed(self.client.query("SELECT 1").fetch_one()).await?;
        debug!(result = one, "ClickHouse connection healthy");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "clickhouse"
    }
}
