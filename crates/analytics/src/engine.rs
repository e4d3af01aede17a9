//! Dashboard queries.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use event_store::{EventStore, SessionRollup};
use serde::Serialize;
use session_cache::{clicks_or_empty, counters_or_default, ClickRecord, SessionCache};
use telemetry::metrics;
use tracing::debug;
use tracking_core::{Result, SessionStatus, TimeRange};

use crate::bots::{BotClass, BotClassifier, BotReport};
use crate::bounce::bounce_rate;
use crate::config::AnalyticsConfig;
use crate::funnel::Funnel;
use crate::ga4::Ga4Alignment;
use crate::sources::{group_sources, TrafficSource};
use crate::{percentage, round1};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub range: TimeRange,
    pub total_sessions: u64,
    /// Sessions not classified as bots; the base for every rate below.
    pub human_sessions: u64,
    pub active_now: u64,
    pub today: u64,
    pub bounce_rate: f64,
    pub conversion_rate: f64,
    pub average_duration_secs: f64,
    /// Mean of each configuring session's best completion percentage.
    pub average_completion: f64,
    /// Mean configured price of priced sessions, in cents.
    pub average_total_price: i64,
    pub funnel: Funnel,
    pub bots: BotReport,
    pub traffic_sources: Vec<TrafficSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ga4: Option<Ga4Alignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStats {
    pub active: u64,
    pub today: u64,
    pub window_secs: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub generated_at: DateTime<Utc>,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0u64), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Read-side aggregation over the store and cache.
pub struct AnalyticsEngine {
    store: Arc<dyn EventStore>,
    cache: Arc<dyn SessionCache>,
    classifier: BotClassifier,
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn EventStore>, cache: Arc<dyn SessionCache>, config: AnalyticsConfig) -> Self {
        Self {
            store,
            cache,
            classifier: BotClassifier::new(config.bots.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub async fn overview(
        &self,
        range: TimeRange,
        ga4_active_users: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsOverview> {
        let start = Instant::now();
        let rollups = self.store.session_rollups(&range).await?;
        let (classes, bots) = self.classifier.classify_all(&rollups);

        let human: Vec<&SessionRollup> = rollups
            .iter()
            .zip(&classes)
            .filter(|(_, class)| **class != BotClass::Bot)
            .map(|(rollup, _)| rollup)
            .collect();

        let converted = human
            .iter()
            .filter(|r| r.session.status == SessionStatus::Completed)
            .count() as u64;
        let average_duration_secs = mean(
            human
                .iter()
                .map(|r| r.session.duration().num_milliseconds().max(0) as f64 / 1000.0),
        );
        let average_completion = mean(
            human
                .iter()
                .filter(|r| r.snapshot_count > 0)
                .map(|r| f64::from(r.max_completion)),
        );
        let average_total_price =
            mean(human.iter().filter_map(|r| r.session.total_price).map(|p| p as f64)).round() as i64;

        let counters = counters_or_default(self.cache.as_ref(), self.config.realtime_window(), now).await;

        let overview = AnalyticsOverview {
            range,
            total_sessions: rollups.len() as u64,
            human_sessions: human.len() as u64,
            active_now: counters.active,
            today: counters.today,
            bounce_rate: bounce_rate(human.iter().map(|r| &r.session)),
            conversion_rate: round1(percentage(converted, human.len() as u64)),
            average_duration_secs: round1(average_duration_secs),
            average_completion: round1(average_completion),
            average_total_price,
            funnel: Funnel::configurator(human.iter().copied()),
            traffic_sources: group_sources(
                rollups
                    .iter()
                    .zip(classes.iter().copied())
                    .map(|(r, class)| (&r.session, class)),
            ),
            ga4: ga4_active_users.map(|users| Ga4Alignment::compute(users, bots.real, &self.config.ga4)),
            bots,
        };

        let elapsed = start.elapsed();
        metrics()
            .analytics_latency_ms
            .observe(elapsed.as_millis() as u64);
        debug!(
            sessions = overview.total_sessions,
            latency_ms = %elapsed.as_millis(),
            "Computed analytics overview"
        );

        Ok(overview)
    }

    /// Coarse live counters from the cache. Zero when the cache is down.
    pub async fn realtime(&self, now: DateTime<Utc>) -> RealtimeStats {
        let counters = counters_or_default(self.cache.as_ref(), self.config.realtime_window(), now).await;
        RealtimeStats {
            active: counters.active,
            today: counters.today,
            window_secs: self.config.realtime_window_secs,
            generated_at: now,
        }
    }

    pub async fn session_clicks(&self, session_id: &str) -> Vec<ClickRecord> {
        clicks_or_empty(self.cache.as_ref(), session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga4::AlignmentBand;
    use chrono::Duration;
    use event_store::MemoryStore;
    use session_cache::MokaSessionCache;
    use tracking_core::{Session, SessionMetadata};

    const CHROME: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

    fn session(id: &str, ua: &str, start: DateTime<Utc>, secs: i64, status: SessionStatus) -> Session {
        let mut s = Session::new(
            id,
            SessionMetadata {
                user_agent: Some(ua.into()),
                utm_source: Some("newsletter".into()),
                ..Default::default()
            },
            start,
        );
        s.last_activity = start + Duration::seconds(secs);
        s.end_time = Some(s.last_activity);
        s.status = status;
        s
    }

    #[tokio::test]
    async fn test_overview_excludes_bots_from_rates() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store.put_session(session("bounced", CHROME, now - Duration::hours(2), 10, SessionStatus::Abandoned));
        let mut converted = session("converted", CHROME, now - Duration::hours(3), 300, SessionStatus::Completed);
        converted.total_price = Some(31_500_000);
        store.put_session(converted);
        store.put_session(session(
            "crawler",
            "Mozilla/5.0 (compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm)",
            now - Duration::hours(1),
            1,
            SessionStatus::Abandoned,
        ));
        // Outside the range.
        store.put_session(session("old", CHROME, now - Duration::days(30), 60, SessionStatus::Abandoned));

        let cache = Arc::new(MokaSessionCache::default());
        cache.mark_active("converted", now).await.unwrap();

        let engine = AnalyticsEngine::new(store, cache, AnalyticsConfig::default());
        let range = TimeRange::parse("7d", now).unwrap();
        let overview = engine.overview(range, Some(2), now).await.unwrap();

        assert_eq!(overview.total_sessions, 3);
        assert_eq!(overview.human_sessions, 2);
        assert_eq!(overview.bots.bot, 1);
        assert_eq!(overview.bounce_rate, 50.0);
        assert_eq!(overview.conversion_rate, 50.0);
        assert_eq!(overview.average_duration_secs, 155.0);
        assert_eq!(overview.average_total_price, 31_500_000);
        assert_eq!(overview.active_now, 1);
        assert_eq!(overview.funnel.stages[0].count, 2);
        assert_eq!(overview.traffic_sources[0].sessions, 3);
        assert_eq!(overview.traffic_sources[0].real_users, 2);

        let ga4 = overview.ga4.unwrap();
        assert_eq!(ga4.ratio_percentage, Some(100.0));
        assert_eq!(ga4.band, AlignmentBand::Excellent);
    }

    #[tokio::test]
    async fn test_empty_range() {
        let now = Utc::now();
        let engine = AnalyticsEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MokaSessionCache::default()),
            AnalyticsConfig::default(),
        );
        let overview = engine
            .overview(TimeRange::parse("24h", now).unwrap(), None, now)
            .await
            .unwrap();

        assert_eq!(overview.total_sessions, 0);
        assert_eq!(overview.bounce_rate, 0.0);
        assert_eq!(overview.funnel.overall_conversion, 0.0);
        assert!(overview.ga4.is_none());
    }
}
