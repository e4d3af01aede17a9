//! Configuration completion percentage.
//!
//! The percentage is a pure function of the configuration blob and the
//! field lists, so a stored value can always be recomputed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Share of the score carried by required fields.
pub const REQUIRED_WEIGHT: f64 = 70.0;

/// Share of the score carried by optional fields.
pub const OPTIONAL_WEIGHT: f64 = 30.0;

/// Which configuration fields count towards completion.
///
/// Field names may use dots to address nested values (`roof.material`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSchema {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
}

impl Default for CompletionSchema {
    fn default() -> Self {
        Self {
            required: ["houseModel", "size", "foundation", "roofType", "facade", "windows"]
                .into_iter()
                .map(String::from)
                .collect(),
            optional: ["interior", "heating", "solarPanels", "extras"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl CompletionSchema {
    pub fn new(required: Vec<String>, optional: Vec<String>) -> Self {
        Self { required, optional }
    }

    /// Weighted completion of `data`, rounded to the nearest whole percent.
    pub fn completion_percentage(&self, data: &Value) -> u8 {
        let required = filled_ratio(&self.required, data);
        let optional = filled_ratio(&self.optional, data);

        let score = match (required, optional) {
            (Some(r), Some(o)) => r * REQUIRED_WEIGHT + o * OPTIONAL_WEIGHT,
            (Some(r), None) => r * 100.0,
            (None, Some(o)) => o * 100.0,
            (None, None) => 0.0,
        };

        score.round().clamp(0.0, 100.0) as u8
    }
}

/// Fraction of `fields` populated in `data`, or `None` for an empty list.
fn filled_ratio(fields: &[String], data: &Value) -> Option<f64> {
    if fields.is_empty() {
        return None;
    }
    let filled = fields
        .iter()
        .filter(|f| is_populated(lookup(data, f)))
        .count();
    Some(filled as f64 / fields.len() as f64)
}

fn lookup<'a>(data: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(data, |value, key| value.as_object()?.get(key))
}

fn is_populated(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}
