//! Constructs concrete [`Sink`]s from the spec's [`SinkConfig`] list.

use std::collections::BTreeMap;

use resinker_spec::SinkConfig;
use tracing::info;

use crate::error::SinkError;
use crate::sink::{FileSink, KafkaSink, Sink, StdoutSink};

/// Build one boxed [`Sink`] per *enabled* entry of `outputs`, in declared
/// order. Disabled sinks are skipped entirely — no connection is
/// established for them (spec.md §4.8).
pub async fn build_sinks(outputs: &[SinkConfig]) -> Result<Vec<Box<dyn Sink>>, SinkError> {
    let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
    for config in outputs {
        if !config.is_enabled() {
            continue;
        }
        match config {
            SinkConfig::Stdout { format, .. } => {
                info!("enabling stdout sink");
                sinks.push(Box::new(StdoutSink::new(*format)));
            }
            SinkConfig::File { file_path, format, .. } => {
                info!(file_path, "enabling file sink");
                sinks.push(Box::new(FileSink::open(file_path.clone(), *format).await?));
            }
            SinkConfig::Kafka {
                topic_mapping,
                default_topic,
                kafka_brokers,
                security_protocol,
                sasl_mechanism,
                sasl_plain_username,
                sasl_plain_password,
                ..
            } => {
                info!(kafka_brokers, "enabling kafka sink");
                let mapping: BTreeMap<String, String> = topic_mapping
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                sinks.push(Box::new(KafkaSink::connect(
                    kafka_brokers,
                    mapping,
                    default_topic.clone(),
                    security_protocol.as_deref(),
                    sasl_mechanism.as_deref(),
                    sasl_plain_username.as_deref(),
                    sasl_plain_password.as_deref(),
                )?));
            }
        }
    }
    Ok(sinks)
}
