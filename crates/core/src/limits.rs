//! Size and time limits for tracking payloads.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field length limits are duplicated there. Keep both in sync when
//! modifying.

// === Batch Limits ===

/// Maximum request body size in bytes (256KB).
///
/// A collector flushes at most a few dozen interactions per request.
pub const MAX_BATCH_SIZE_BYTES: usize = 256 * 1024;

/// Maximum interactions per request.
pub const MAX_BATCH_EVENTS: usize = 100;

// === Blob Limits ===

/// Maximum serialized `additionalData` size in bytes (8KB).
pub const MAX_ADDITIONAL_DATA_BYTES: usize = 8 * 1024;

/// Maximum serialized `configurationData` size in bytes (32KB).
pub const MAX_CONFIGURATION_BYTES: usize = 32 * 1024;

// === String Field Limits (chars) ===

/// Client-generated session id max length.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// User agent string max length.
pub const MAX_USER_AGENT_LEN: usize = 512;

/// Referrer URL max length.
pub const MAX_REFERRER_LEN: usize = 2048;

/// Element id / CSS selector max length.
pub const MAX_ELEMENT_ID_LEN: usize = 256;

/// Interaction and selection category max length.
pub const MAX_CATEGORY_LEN: usize = 64;

/// Field and selection values (current and previous).
pub const MAX_FIELD_VALUE_LEN: usize = 1000;

/// Form field name / form id max length.
pub const MAX_FIELD_NAME_LEN: usize = 128;

/// HTML input type max length.
pub const MAX_INPUT_TYPE_LEN: usize = 32;

/// Clicked element tag name max length.
pub const MAX_TAG_LEN: usize = 64;

/// Clicked element text max length.
pub const MAX_CLICK_TEXT_LEN: usize = 200;

/// Page path max length.
pub const MAX_PATH_LEN: usize = 2000;

/// Page title max length.
pub const MAX_TITLE_LEN: usize = 500;

// === Price Bounds ===

/// Largest accepted total price in cents (100M).
///
/// Configured houses are priced in the hundreds of thousands; anything
/// above this is a client bug.
pub const MAX_TOTAL_PRICE_CENTS: i64 = 10_000_000_000;

// === Timestamp Bounds ===

/// Maximum allowed clock skew for future timestamps (seconds).
///
/// Browser clocks drift; debounced clicks are stamped at window close.
pub const MAX_FUTURE_SKEW_SECS: i64 = 30;

/// Maximum age for stale events (hours).
pub const MAX_EVENT_AGE_HOURS: i64 = 24;
