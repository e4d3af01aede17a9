//! Traffic source attribution.

use std::collections::HashMap;

use serde::Serialize;
use tracking_core::Session;

use crate::bots::BotClass;

pub const DIRECT: &str = "direct";

/// `utm_source` if present, else the referrer host, else `direct`.
pub fn traffic_source(session: &Session) -> String {
    if let Some(utm) = session.utm_source.as_deref().map(str::trim) {
        if !utm.is_empty() {
            return utm.to_ascii_lowercase();
        }
    }

    session
        .referrer
        .as_deref()
        .and_then(|r| url::Url::parse(r).ok())
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_ascii_lowercase()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DIRECT.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSource {
    pub source: String,
    pub sessions: u64,
    pub real_users: u64,
}

/// Group sessions by source, largest first.
pub fn group_sources<'a>(sessions: impl IntoIterator<Item = (&'a Session, BotClass)>) -> Vec<TrafficSource> {
    let mut by_source: HashMap<String, TrafficSource> = HashMap::new();
    for (session, class) in sessions {
        let source = traffic_source(session);
        let entry = by_source.entry(source.clone()).or_insert_with(|| TrafficSource {
            source,
            sessions: 0,
            real_users: 0,
        });
        entry.sessions += 1;
        if class == BotClass::Real {
            entry.real_users += 1;
        }
    }

    let mut sources: Vec<TrafficSource> = by_source.into_values().collect();
    sources.sort_by(|a, b| b.sessions.cmp(&a.sessions).then_with(|| a.source.cmp(&b.source)));
    sources
}
