//! The wire shape of one emitted record (spec.md §6 "Emitted record format").

use chrono::{DateTime, Utc};
use resinker_spec::RecordFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single committed event, ready for sink fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmittedRecord {
    /// Event type name.
    pub event_type: String,
    /// ISO 8601 simulation timestamp at commit time.
    pub timestamp: String,
    /// Generated payload, field order as declared in the schema.
    pub payload: Map<String, Value>,
}

impl EmittedRecord {
    /// Construct a record from its three fields.
    pub fn new(event_type: impl Into<String>, timestamp: DateTime<Utc>, payload: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            payload,
        }
    }

    /// Render per `format`: `json` is a single compact line (NDJSON-ready,
    /// per spec.md §9's normative choice); `json_pretty` is two-space
    /// indented with spec-declared key order (`serde_json` preserves
    /// insertion order via the `preserve_order` feature transitively
    /// enabled by `resinker-spec`'s `indexmap`/`serde_json` combination).
    pub fn render(&self, format: RecordFormat) -> Result<String, serde_json::Error> {
        match format {
            RecordFormat::Json => serde_json::to_string(self),
            RecordFormat::JsonPretty => serde_json::to_string_pretty(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_json_render_is_single_line() {
        let mut payload = Map::new();
        payload.insert("user_id".to_string(), Value::String("u1".to_string()));
        let record = EmittedRecord::new("UserRegistered", epoch(), payload);
        let rendered = record.render(RecordFormat::Json).unwrap();
        assert!(!rendered.contains('\n'));
        assert!(rendered.contains("UserRegistered"));
    }

    #[test]
    fn test_json_pretty_render_is_indented() {
        let record = EmittedRecord::new("UserRegistered", epoch(), Map::new());
        let rendered = record.render(RecordFormat::JsonPretty).unwrap();
        assert!(rendered.contains("\n  "));
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let mut payload = Map::new();
        payload.insert("amount".to_string(), Value::from(25.50));
        let record = EmittedRecord::new("Purchase", epoch(), payload);
        let rendered = record.render(RecordFormat::Json).unwrap();
        let parsed: EmittedRecord = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, record);
    }
}
