//! Store Adapter: loosely-typed items, the typed record codec and backends.
//!
//! Everything above this crate works with [`engine_core`] records; only the
//! codec knows how they look as items.

pub mod adapter;
pub mod clickhouse_store;
pub mod codec;
pub mod config;
pub mod item;
pub mod memory;
pub mod schema;

use std::sync::Arc;

use engine_core::Result;
use tracing::info;

pub use adapter::*;
pub use clickhouse_store::ClickHouseStore;
pub use codec::{decode_all, Record};
pub use config::*;
pub use item::{key_item, AttrValue, Item};
pub use memory::MemoryStore;

/// Build the configured backend. ClickHouse gets its schema created here.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new(&config.tables)))
        }
        StoreBackend::ClickHouse => {
            let store = ClickHouseStore::new(config.clickhouse.clone(), &config.tables);
            store.init_schema().await?;
            Ok(Arc::new(store))
        }
    }
}
