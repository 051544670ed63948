use serde::{Deserialize, Serialize};

/// One time-series observation submitted for persistence.
///
/// Only the envelope is typed; point values stay opaque JSON so the
/// component never constrains the upstream schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Series name the record belongs to.
    pub name: String,
    /// Column labels, positionally matching each point entry.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Data points, one row per observation.
    #[serde(default)]
    pub points: Vec<Vec<serde_json::Value>>,
}
