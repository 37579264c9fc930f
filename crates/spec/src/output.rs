//! Sink configurations (spec.md §6 "Sink configurations").

use indexmap::IndexMap;
use serde::Deserialize;

/// Output record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    /// One compact JSON object per line (file sinks: NDJSON, per spec.md §9).
    Json,
    /// Two-space-indented JSON, spec-declared key order.
    JsonPretty,
}

/// One entry of the top-level `outputs` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Writes formatted records to standard output.
    Stdout {
        /// Whether this sink is active.
        enabled: bool,
        /// Output format.
        format: RecordFormat,
    },
    /// Appends formatted records to a file, creating parent directories.
    File {
        /// Whether this sink is active.
        enabled: bool,
        /// Destination file path.
        file_path: String,
        /// Output format.
        format: RecordFormat,
    },
    /// Publishes records to a Kafka-style topic.
    Kafka {
        /// Whether this sink is active.
        enabled: bool,
        /// Event type name to topic name.
        #[serde(default)]
        topic_mapping: IndexMap<String, String>,
        /// Topic used when an event type has no entry in `topic_mapping`.
        default_topic: Option<String>,
        /// Broker connect string (e.g. `"broker1:9092,broker2:9092"`).
        kafka_brokers: String,
        /// Security protocol, passed through to the client config verbatim.
        security_protocol: Option<String>,
        /// SASL mechanism, passed through to the client config verbatim.
        sasl_mechanism: Option<String>,
        /// SASL username.
        sasl_plain_username: Option<String>,
        /// SASL password.
        sasl_plain_password: Option<String>,
    },
}

impl SinkConfig {
    /// Whether this sink is enabled.
    pub fn is_enabled(&self) -> bool {
        match self {
            SinkConfig::Stdout { enabled, .. } => *enabled,
            SinkConfig::File { enabled, .. } => *enabled,
            SinkConfig::Kafka { enabled, .. } => *enabled,
        }
    }

    /// Short human-readable label for diagnostics and `resinker info`.
    pub fn kind_label(&self) -> &'static str {
        match self {
            SinkConfig::Stdout { .. } => "stdout",
            SinkConfig::File { .. } => "file",
            SinkConfig::Kafka { .. } => "kafka",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_sink() {
        let yaml = "type: stdout\nenabled: true\nformat: json\n";
        let sink: SinkConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(sink.is_enabled());
        assert!(matches!(sink, SinkConfig::Stdout { .. }));
    }

    #[test]
    fn test_kind_label() {
        let yaml = "type: stdout\nenabled: true\nformat: json\n";
        let sink: SinkConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(sink.kind_label(), "stdout");
    }

    #[test]
    fn test_kafka_sink_defaults_topic_mapping() {
        let yaml = "\
type: kafka
enabled: false
kafka_brokers: \"localhost:9092\"
default_topic: events
";
        let sink: SinkConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(!sink.is_enabled());
        match sink {
            SinkConfig::Kafka { topic_mapping, default_topic, .. } => {
                assert!(topic_mapping.is_empty());
                assert_eq!(default_topic.as_deref(), Some("events"));
            }
            _ => panic!("expected kafka sink"),
        }
    }
}
