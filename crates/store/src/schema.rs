//! ClickHouse table schema.
//!
//! All logical tables share one `items` table:
//! - `table_name` + `item_key` identify an item
//! - `body` holds the item as a JSON object
//! - `ReplacingMergeTree(version)` keeps the newest write per key

/// SQL for creating the database.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

/// SQL for creating the items table.
pub fn create_items_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {}.items (
    table_name LowCardinality(String),
    item_key String,
    body String,
    version UInt64,
    written_at DateTime DEFAULT now()
)
ENGINE = ReplacingMergeTree(version)
ORDER BY (table_name, item_key)
SETTINGS index_granularity = 8192
"#,
        database
    )
}

/// Returns all DDL statements in execution order.
pub fn all_statements(database: &str) -> Vec<String> {
    vec![create_database(database), create_items_table(database)]
}
