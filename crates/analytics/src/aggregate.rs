//! Aggregation engine.
//!
//! Every function here is a pure function of the scanned records, `now` and
//! its parameters. Nothing touches the store.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use engine_core::clock::{duration_ms, format_minutes_seconds};
use engine_core::limits::{HOUR_DETAIL_EVENTS, RECENT_DETAIL_EVENTS};
use engine_core::{ActiveSessionProjection, DisplayZone, Event, ReferrerTable, Session};
use serde::{Deserialize, Serialize};

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket start in the display zone, `HH:MM`
    pub label: String,
    /// Bucket start, UTC ms
    pub start_ms: i64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCount {
    pub page: String,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerCount {
    pub label: String,
    pub count: u64,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_sessions: u64,
    pub total_events: u64,
    /// `"{m}m {s}s"`
    pub avg_session_time: String,
    pub avg_session_time_ms: i64,
    /// `"{:.1}%"`
    pub conversion_rate: String,
    pub conversion_rate_pct: f64,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            total_sessions: 0,
            total_events: 0,
            avg_session_time: format_minutes_seconds(0),
            avg_session_time_ms: 0,
            conversion_rate: format_rate(0.0),
            conversion_rate_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Realtime {
    pub total_events: u64,
    pub page_views: u64,
    pub clicks: u64,
    pub hourly_distribution: BTreeMap<String, u64>,
    pub popular_pages: Vec<PageCount>,
    pub last_updated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: u64,
    pub active_sessions: u64,
    pub avg_duration_secs: f64,
    pub avg_page_views: f64,
    /// Share of sessions with at most one page view, 0.0 to 1.0
    pub bounce_rate: f64,
}

/// A session that is "online now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSessionView {
    pub session_id: String,
    pub user_id: String,
    pub last_activity: i64,
    pub current_page: String,
    /// Time since last activity, ms
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetail {
    pub event_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub event_type: String,
    pub page_url: String,
    pub timestamp: i64,
    pub formatted_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourDetails {
    pub hour: String,
    pub total_events: u64,
    pub events: Vec<EventDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageVisit {
    pub event_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub timestamp: i64,
    pub formatted_time: String,
    pub referrer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDetails {
    pub page_url: String,
    pub total_views: u64,
    pub recent_events: Vec<PageVisit>,
    pub hourly_distribution: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerVisit {
    pub event_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub timestamp: i64,
    pub formatted_time: String,
    pub landing_page: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerDetails {
    pub referrer: String,
    pub total_visitors: u64,
    pub recent_visits: Vec<ReferrerVisit>,
    pub hourly_distribution: BTreeMap<String, u64>,
}

fn format_rate(pct: f64) -> String {
    format!("{:.1}%", pct)
}

/// Count keys, then sort by count descending. Ties keep first-seen order.
fn rank<K, I>(keys: I, n: usize) -> Vec<(K, u64)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut counts: Vec<(K, u64)> = Vec::new();
    let mut position: HashMap<K, usize> = HashMap::new();
    for key in keys {
        match position.get(&key) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                position.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}

/// Newest first, stable for equal timestamps.
fn newest_first<'a>(events: impl IntoIterator<Item = &'a Event>) -> Vec<&'a Event> {
    let mut events: Vec<&Event> = events.into_iter().collect();
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events
}

/// Fixed-length histogram of `bucket_count` buckets of `width_ms`, the last
/// one containing `now`.
///
/// Events outside `[now - bucket_count * width_ms, now]` are ignored, as are
/// in-window events that floor to a time before the first bucket.
pub fn bucket_counts(
    events: &[Event],
    now: i64,
    width_ms: i64,
    bucket_count: usize,
    zone: &DisplayZone,
) -> Vec<Bucket> {
    if bucket_count == 0 {
        return Vec::new();
    }
    let width_ms = width_ms.max(1);
    let span = width_ms.saturating_mul(bucket_count as i64);
    let last_start = zone.floor_ms(now, width_ms);
    let first_start = last_start - width_ms * (bucket_count as i64 - 1);

    let mut buckets: Vec<Bucket> = (0..bucket_count as i64)
        .map(|i| {
            let start_ms = first_start + i * width_ms;
            Bucket {
                label: zone.minute_label(start_ms),
                start_ms,
                count: 0,
            }
        })
        .collect();

    let window_start = now.saturating_sub(span);
    for event in events {
        if event.timestamp < window_start || event.timestamp > now {
            continue;
        }
        let start = zone.floor_ms(event.timestamp, width_ms);
        if start < first_start {
            continue;
        }
        let index = ((start - first_start) / width_ms) as usize;
        if let Some(bucket) = buckets.get_mut(index) {
            bucket.count += 1;
        }
    }
    buckets
}

/// Most viewed pages among `page_view` events.
pub fn top_pages(events: &[Event], n: usize) -> Vec<PageCount> {
    rank(
        events
            .iter()
            .filter(|e| e.event_type.is_page_view())
            .map(|e| e.page_url.as_str()),
        n,
    )
    .into_iter()
    .map(|(page, views)| PageCount {
        page: page.to_string(),
        views,
    })
    .collect()
}

/// Referrer labels among `page_view` events.
pub fn top_referrers(events: &[Event], n: usize, table: &ReferrerTable) -> Vec<ReferrerCount> {
    rank(
        events
            .iter()
            .filter(|e| e.event_type.is_page_view())
            .map(|e| table.classify(&e.referrer)),
        n,
    )
    .into_iter()
    .map(|(label, count)| ReferrerCount { label, count })
    .collect()
}

/// Headline KPIs from live sessions and recent events.
pub fn summarize(
    active_sessions: &[ActiveSessionProjection],
    recent_events: &[Event],
    now: i64,
) -> Summary {
    let total_sessions = active_sessions.len() as u64;
    let total_events = recent_events.len() as u64;

    let avg_session_time_ms = if active_sessions.is_empty() {
        0
    } else {
        let total: i128 = active_sessions
            .iter()
            .map(|s| i128::from(duration_ms(s.last_activity, now)))
            .sum();
        i64::try_from(total / active_sessions.len() as i128).unwrap_or(i64::MAX)
    };

    let conversions = recent_events
        .iter()
        .filter(|e| e.event_type.is_conversion())
        .count() as f64;
    let conversion_rate_pct = conversions / (total_events.max(1) as f64) * 100.0;

    Summary {
        total_sessions,
        total_events,
        avg_session_time: format_minutes_seconds(avg_session_time_ms),
        avg_session_time_ms,
        conversion_rate: format_rate(conversion_rate_pct),
        conversion_rate_pct,
    }
}

/// Event counts per display-zone hour, keyed `HH:00`.
pub fn hourly_distribution<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    zone: &DisplayZone,
) -> BTreeMap<String, u64> {
    let mut distribution = BTreeMap::new();
    for event in events {
        *distribution.entry(zone.hour_label(event.timestamp)).or_insert(0) += 1;
    }
    distribution
}

/// Overview of the scanned events.
pub fn realtime_overview(events: &[Event], now: i64, zone: &DisplayZone, top_n: usize) -> Realtime {
    Realtime {
        total_events: events.len() as u64,
        page_views: events.iter().filter(|e| e.event_type.is_page_view()).count() as u64,
        clicks: events.iter().filter(|e| e.event_type.is_click()).count() as u64,
        hourly_distribution: hourly_distribution(events, zone),
        popular_pages: top_pages(events, top_n),
        last_updated: zone.local(now).to_rfc3339(),
    }
}

/// Aggregate statistics over stored sessions.
pub fn session_stats(sessions: &[Session], now: i64, active_horizon_ms: i64) -> SessionStats {
    if sessions.is_empty() {
        return SessionStats::default();
    }
    let n = sessions.len() as f64;
    let active = sessions
        .iter()
        .filter(|s| s.is_active_at(now, active_horizon_ms))
        .count() as u64;
    let total_duration_ms: f64 = sessions.iter().map(|s| s.session_duration as f64).sum();
    let total_page_views: f64 = sessions.iter().map(|s| s.page_views as f64).sum();
    let bounces = sessions.iter().filter(|s| s.is_bounce()).count() as f64;

    SessionStats {
        total_sessions: sessions.len() as u64,
        active_sessions: active,
        avg_duration_secs: total_duration_ms / n / 1000.0,
        avg_page_views: total_page_views / n,
        bounce_rate: bounces / n,
    }
}

/// Live projections, most recently active first.
pub fn active_sessions(projections: &[ActiveSessionProjection], now: i64) -> Vec<ActiveSessionView> {
    let mut live: Vec<ActiveSessionView> = projections
        .iter()
        .filter(|p| !p.is_expired(now))
        .map(|p| ActiveSessionView {
            session_id: p.session_id.clone(),
            user_id: p.user_id.clone(),
            last_activity: p.last_activity,
            current_page: p.current_page.clone(),
            duration: duration_ms(p.last_activity, now),
        })
        .collect();
    live.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    live
}

/// Events whose `width_ms` bucket label equals `hour`.
pub fn hour_details(events: &[Event], hour: &str, width_ms: i64, zone: &DisplayZone) -> HourDetails {
    let matching = newest_first(
        events
            .iter()
            .filter(|e| zone.minute_label(zone.floor_ms(e.timestamp, width_ms)) == hour),
    );

    HourDetails {
        hour: hour.to_string(),
        total_events: matching.len() as u64,
        events: matching
            .into_iter()
            .take(HOUR_DETAIL_EVENTS)
            .map(|e| EventDetail {
                event_id: e.event_id.clone(),
                user_id: e.user_id.clone(),
                session_id: e.session_id.clone(),
                event_type: e.event_type.to_string(),
                page_url: e.page_url.clone(),
                timestamp: e.timestamp,
                formatted_time: zone.time_label(e.timestamp),
            })
            .collect(),
    }
}

/// Page views of one URL.
pub fn page_details(events: &[Event], page_url: &str, zone: &DisplayZone) -> PageDetails {
    let views = newest_first(
        events
            .iter()
            .filter(|e| e.event_type.is_page_view() && e.page_url == page_url),
    );

    PageDetails {
        page_url: page_url.to_string(),
        total_views: views.len() as u64,
        hourly_distribution: hourly_distribution(views.iter().copied(), zone),
        recent_events: views
            .iter()
            .take(RECENT_DETAIL_EVENTS)
            .map(|e| PageVisit {
                event_id: e.event_id.clone(),
                user_id: e.user_id.clone(),
                session_id: e.session_id.clone(),
                timestamp: e.timestamp,
                formatted_time: zone.time_label(e.timestamp),
                referrer: e.referrer.clone(),
            })
            .collect(),
    }
}

/// Page views arriving from one referrer label or referrer substring.
pub fn referrer_details(
    events: &[Event],
    referrer: &str,
    table: &ReferrerTable,
    zone: &DisplayZone,
) -> ReferrerDetails {
    let visits = newest_first(
        events
            .iter()
            .filter(|e| e.event_type.is_page_view() && table.matches(referrer, &e.referrer)),
    );

    ReferrerDetails {
        referrer: referrer.to_string(),
        total_visitors: visits.len() as u64,
        hourly_distribution: hourly_distribution(visits.iter().copied(), zone),
        recent_visits: visits
            .iter()
            .take(RECENT_DETAIL_EVENTS)
            .map(|e| ReferrerVisit {
                event_id: e.event_id.clone(),
                user_id: e.user_id.clone(),
                session_id: e.session_id.clone(),
                timestamp: e.timestamp,
                formatted_time: zone.day_label(e.timestamp),
                landing_page: e.page_url.clone(),
            })
            .collect(),
    }
}
