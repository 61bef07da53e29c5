//! Evidence bags attached to alerts and behavior events.
//!
//! These are heterogenous payloads, not schema: a string-keyed map of JSON
//! values, serialized to JSON text at the persistence boundary.

use serde_json::{Map, Value};

/// A structured evidence dictionary.
pub type Evidence = Map<String, Value>;

/// Build an evidence map from `(key, value)` pairs.
pub fn evidence_from(pairs: Vec<(&str, Value)>) -> Evidence {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Serialize evidence to JSON text for a database column.
pub fn to_json(evidence: &Evidence) -> String {
    serde_json::to_string(evidence).unwrap_or_else(|_| "{}".to_string())
}

/// Parse a JSON text column back into an evidence map.
/// Malformed or non-object JSON yields an empty map.
pub fn from_json(text: &str) -> Evidence {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
