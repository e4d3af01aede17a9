//! Test fixtures and payload generators.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

pub const CHROME_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub const GOOGLEBOT_UA: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

/// A fresh session id.
pub fn session_id() -> String {
    format!("sess-{}", Uuid::new_v4())
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A `page_visit` interaction.
pub fn page_visit(session_id: &str, path: &str, timestamp: i64) -> Value {
    json!({
        "sessionId": session_id,
        "eventType": "page_visit",
        "category": "navigation",
        "timestamp": timestamp,
        "url": format!("https://configurator.example.com{}?utm_source=newsletter", path),
        "deviceInfo": {"deviceType": "desktop", "viewport": {"width": 1440, "height": 900}},
        "additionalData": {"path": path}
    })
}

/// A debounced `click` interaction.
pub fn click(session_id: &str, element_id: &str, click_count: u32, timestamp: i64) -> Value {
    json!({
        "sessionId": session_id,
        "eventType": "click",
        "category": "cta",
        "elementId": element_id,
        "timestamp": timestamp,
        "additionalData": {"tag": "button", "clickCount": click_count}
    })
}

/// A `form_submit` interaction.
pub fn form_submit(session_id: &str, form_id: &str, timestamp: i64) -> Value {
    json!({
        "sessionId": session_id,
        "eventType": "form_submit",
        "category": "form",
        "elementId": form_id,
        "timestamp": timestamp,
        "additionalData": {"formId": form_id, "fieldCount": 4}
    })
}

/// Object-with-events payload.
pub fn batch(events: Vec<Value>) -> Value {
    json!({ "events": events })
}

pub fn selection(session_id: &str, category: &str, value: &str, total_price: i64) -> Value {
    json!({
        "sessionId": session_id,
        "category": category,
        "selection": value,
        "totalPrice": total_price,
        "priceChange": 0,
        "timeSpentMs": 1200
    })
}

/// A configuration with every required field set and no optional ones.
pub fn required_configuration() -> Value {
    json!({
        "houseModel": "villa",
        "size": 160,
        "foundation": "slab",
        "roofType": "gable",
        "facade": "brick",
        "windows": "triple"
    })
}

pub fn snapshot(session_id: &str, configuration: Value, total_price: i64) -> Value {
    json!({
        "sessionId": session_id,
        "configurationData": configuration,
        "totalPrice": total_price,
        "triggerEvent": "step_change"
    })
}

pub fn finalize(session_id: &str, timestamp: Option<i64>) -> Value {
    let mut body = json!({ "sessionId": session_id });
    if let Some(ts) = timestamp {
        body["timestamp"] = json!(ts);
    }
    body
}
