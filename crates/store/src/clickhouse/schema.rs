//! ClickHouse table schemas.
//!
//! - DateTime64(3) for millisecond precision
//! - LowCardinality for enum-like fields
//! - JSON blobs stored as String
//! - Sessions are versioned rows in a ReplacingMergeTree; reads use FINAL

pub const SESSIONS_TABLE: &str = "sessions";
pub const INTERACTIONS_TABLE: &str = "interactions";
pub const SELECTIONS_TABLE: &str = "selections";
pub const SNAPSHOTS_TABLE: &str = "configuration_snapshots";
pub const METRICS_TABLE: &str = "performance_metrics";

pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

/// SQL for creating the sessions table.
///
/// Every guarded update writes a new row with a higher `version`; merges
/// keep the latest.
pub const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id String,
    session_id String,
    ip_address Nullable(String),
    user_agent Nullable(String),
    referrer Nullable(String),
    utm_source Nullable(String),
    country Nullable(String),
    start_time DateTime64(3),
    end_time Nullable(DateTime64(3)),
    last_activity DateTime64(3),
    status LowCardinality(String),
    total_price Nullable(Int64),
    configuration_data String,
    event_count UInt64,
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
ORDER BY session_id
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the interactions log.
pub const CREATE_INTERACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS interactions (
    id String,
    session_id String,
    event_type LowCardinality(String),
    category LowCardinality(String),
    element_id Nullable(String),
    selection_value Nullable(String),
    previous_value Nullable(String),
    time_spent Nullable(Int64),
    device_type LowCardinality(String),
    viewport_width UInt32,
    viewport_height UInt32,
    timestamp DateTime64(3),
    received_at DateTime64(3),
    additional_data String
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (session_id, timestamp, id)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the selections log. Money in cents.
pub const CREATE_SELECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS selections (
    id String,
    session_id String,
    category LowCardinality(String),
    selection String,
    previous_selection Nullable(String),
    total_price Int64,
    price_change Int64,
    timestamp DateTime64(3),
    time_spent_ms Int64
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (session_id, timestamp, id)
SETTINGS index_granularity = 8192
"#;

pub const CREATE_SNAPSHOTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS configuration_snapshots (
    id String,
    session_id String,
    configuration_data String,
    total_price Int64,
    completion_percentage UInt8,
    trigger_event LowCardinality(String),
    timestamp DateTime64(3)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (session_id, timestamp, id)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the performance metrics log.
///
/// Server samples are written with an empty session id.
pub const CREATE_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS performance_metrics (
    id String,
    session_id Nullable(String),
    metric_name LowCardinality(String),
    value Float64,
    endpoint Nullable(String),
    timestamp DateTime64(3),
    additional_data String
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (metric_name, timestamp)
TTL toDateTime(timestamp) + INTERVAL 90 DAY
SETTINGS index_granularity = 8192
"#;

/// All table DDL in creation order.
pub fn all_tables() -> &'static [&'static str] {
    &[
        CREATE_SESSIONS_TABLE,
        CREATE_INTERACTIONS_TABLE,
        CREATE_SELECTIONS_TABLE,
        CREATE_SNAPSHOTS_TABLE,
        CREATE_METRICS_TABLE,
    ]
}
