//! Two-way mapping between typed records and store items.
//!
//! Optional strings are written as empty strings and read back as `None`.
//! Numbers are accepted as numbers or numeric strings.

use engine_core::{ActiveSessionProjection, Error, Event, EventType, Result, Session};

use crate::adapter::EXPIRES_AT;
use crate::item::{key_item, AttrValue, Item};

/// A typed record with a store representation.
pub trait Record: Sized {
    /// Primary key attribute.
    const KEY: &'static str;

    fn to_item(&self) -> Item;

    fn from_item(item: &Item) -> Result<Self>;

    /// Key item addressing this record.
    fn key(&self) -> Item;
}

fn put(item: &mut Item, attr: &str, value: impl Into<AttrValue>) {
    item.insert(attr.to_string(), value.into());
}

fn req_str(item: &Item, attr: &str) -> Result<String> {
    match item.get(attr) {
        Some(AttrValue::S(s)) if !s.is_empty() => Ok(s.clone()),
        Some(AttrValue::N(n)) => Ok(n.to_string()),
        _ => Err(Error::malformed_record(format!("missing '{}'", attr))),
    }
}

fn str_or_empty(item: &Item, attr: &str) -> String {
    match item.get(attr) {
        Some(AttrValue::S(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn opt_str(item: &Item, attr: &str) -> Option<String> {
    Some(str_or_empty(item, attr)).filter(|s| !s.is_empty())
}

fn req_i64(item: &Item, attr: &str) -> Result<i64> {
    item.get(attr)
        .and_then(AttrValue::as_i64)
        .ok_or_else(|| Error::malformed_record(format!("'{}' is not an integer", attr)))
}

fn counter(item: &Item, attr: &str) -> Result<u64> {
    match item.get(attr) {
        None => Ok(0),
        Some(value) => value
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| Error::malformed_record(format!("'{}' is not a counter", attr))),
    }
}

/// Read the optional expiry attribute of any item.
pub fn expires_at(item: &Item) -> Option<i64> {
    item.get(EXPIRES_AT).and_then(AttrValue::as_i64)
}

/// Attach an expiry attribute to an item.
pub fn with_expiry(mut item: Item, expires_at_ms: i64) -> Item {
    put(&mut item, EXPIRES_AT, expires_at_ms);
    item
}

impl Record for Event {
    const KEY: &'static str = "event_id";

    fn to_item(&self) -> Item {
        let mut item = Item::new();
        put(&mut item, "event_id", self.event_id.as_str());
        put(&mut item, "timestamp", self.timestamp);
        put(&mut item, "user_id", self.user_id.as_str());
        put(&mut item, "session_id", self.session_id.clone().unwrap_or_default());
        put(&mut item, "event_type", self.event_type.as_str());
        put(&mut item, "page_url", self.page_url.as_str());
        put(&mut item, "referrer", self.referrer.as_str());
        put(&mut item, "user_agent", self.user_agent.clone().unwrap_or_default());
        put(&mut item, "ip_address", self.ip_address.clone().unwrap_or_default());
        item
    }

    fn from_item(item: &Item) -> Result<Self> {
        Ok(Self {
            event_id: req_str(item, "event_id")?,
            timestamp: req_i64(item, "timestamp")?,
            user_id: str_or_empty(item, "user_id"),
            session_id: opt_str(item, "session_id"),
            event_type: EventType::from_stored(&req_str(item, "event_type")?),
            page_url: str_or_empty(item, "page_url"),
            referrer: str_or_empty(item, "referrer"),
            user_agent: opt_str(item, "user_agent"),
            ip_address: opt_str(item, "ip_address"),
        })
    }

    fn key(&self) -> Item {
        key_item(Self::KEY, self.event_id.as_str())
    }
}

impl Record for Session {
    const KEY: &'static str = "session_id";

    fn to_item(&self) -> Item {
        let mut item = Item::new();
        put(&mut item, "session_id", self.session_id.as_str());
        put(&mut item, "user_id", self.user_id.as_str());
        put(&mut item, "start_time", self.start_time);
        put(&mut item, "last_activity", self.last_activity);
        put(&mut item, "entry_page", self.entry_page.as_str());
        put(&mut item, "exit_page", self.exit_page.as_str());
        put(&mut item, "referrer", self.referrer.as_str());
        put(&mut item, "total_events", self.total_events);
        put(&mut item, "page_views", self.page_views);
        put(&mut item, "total_clicks", self.total_clicks);
        put(&mut item, "session_duration", self.session_duration);
        put(&mut item, "is_active", self.is_active);
        put(&mut item, "ip_address", self.ip_address.clone().unwrap_or_default());
        put(&mut item, "user_agent", self.user_agent.clone().unwrap_or_default());
        item
    }

    fn from_item(item: &Item) -> Result<Self> {
        let session_id = req_str(item, "session_id")?;
        let start_time = req_i64(item, "start_time")?;
        let last_activity = req_i64(item, "last_activity")?;
        if start_time > last_activity {
            return Err(Error::malformed_record(format!(
                "session {} starts after its last activity",
                session_id
            )));
        }

        Ok(Self {
            user_id: str_or_empty(item, "user_id"),
            start_time,
            last_activity,
            entry_page: str_or_empty(item, "entry_page"),
            exit_page: str_or_empty(item, "exit_page"),
            referrer: str_or_empty(item, "referrer"),
            total_events: counter(item, "total_events")?.max(1),
            page_views: counter(item, "page_views")?,
            total_clicks: counter(item, "total_clicks")?,
            // Derived, never trusted from storage
            session_duration: last_activity - start_time,
            is_active: item
                .get("is_active")
                .and_then(AttrValue::as_bool)
                .unwrap_or(false),
            ip_address: opt_str(item, "ip_address"),
            user_agent: opt_str(item, "user_agent"),
            session_id,
        })
    }

    fn key(&self) -> Item {
        key_item(Self::KEY, self.session_id.as_str())
    }
}

impl Record for ActiveSessionProjection {
    const KEY: &'static str = "session_id";

    fn to_item(&self) -> Item {
        let mut item = Item::new();
        put(&mut item, "session_id", self.session_id.as_str());
        put(&mut item, "user_id", self.user_id.as_str());
        put(&mut item, "last_activity", self.last_activity);
        put(&mut item, "current_page", self.current_page.as_str());
        put(&mut item, EXPIRES_AT, self.expires_at);
        item
    }

    fn from_item(item: &Item) -> Result<Self> {
        Ok(Self {
            session_id: req_str(item, "session_id")?,
            user_id: str_or_empty(item, "user_id"),
            last_activity: req_i64(item, "last_activity")?,
            current_page: str_or_empty(item, "current_page"),
            expires_at: req_i64(item, EXPIRES_AT)?,
        })
    }

    fn key(&self) -> Item {
        key_item(Self::KEY, self.session_id.as_str())
    }
}

/// Decode every item. The first undecodable item fails the batch.
pub fn decode_all<R: Record>(items: &[Item]) -> Result<Vec<R>> {
    items.iter().map(R::from_item).collect()
}
