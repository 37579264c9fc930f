//! Sink trait and the three concrete implementations (spec.md §4.8, §6).

use std::path::PathBuf;
use std::sync::Arc;

use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use resinker_spec::RecordFormat;
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

use crate::error::SinkError;
use crate::record::EmittedRecord;

/// One egress destination for emitted records.
///
/// Implementations own their connection/file handle, scoped to the worker
/// task `resinker-sinks::fanout::SinkFanout` spawns for them (spec.md §5:
/// "scoped acquisition, guaranteed release on all exit paths").
#[allow(async_fn_in_trait)]
pub trait Sink: Send {
    /// Deliver one record. Sink faults are logged by the caller and never
    /// abort the run; a sink that returns `Err` repeatedly is the caller's
    /// cue to mark it unhealthy.
    async fn send(&mut self, record: &EmittedRecord) -> Result<(), SinkError>;

    /// Flush any buffered state. Called once on orderly shutdown.
    async fn flush(&mut self) -> Result<(), SinkError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Writes formatted records to standard output.
pub struct StdoutSink {
    format: RecordFormat,
}

impl StdoutSink {
    /// Construct a stdout sink with the given output format.
    pub fn new(format: RecordFormat) -> Self {
        Self { format }
    }
}

impl Sink for StdoutSink {
    async fn send(&mut self, record: &EmittedRecord) -> Result<(), SinkError> {
        let rendered = record.render(self.format)?;
        println!("{rendered}");
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        use std::io::Write;
        std::io::stdout().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

/// Appends NDJSON-formatted records to a file, creating parent directories
/// as needed (spec.md §4.8, §6, §9's NDJSON normative choice).
pub struct FileSink {
    path: PathBuf,
    format: RecordFormat,
    file: Option<tokio::fs::File>,
}

impl FileSink {
    /// Open (creating parent directories and the file if missing) a file
    /// sink at `file_path`.
    pub async fn open(file_path: impl Into<PathBuf>, format: RecordFormat) -> Result<Self, SinkError> {
        let path = file_path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self { path, format, file: Some(file) })
    }
}

impl Sink for FileSink {
    async fn send(&mut self, record: &EmittedRecord) -> Result<(), SinkError> {
        let rendered = record.render(self.format)?;
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| SinkError::QueueClosed(self.path.display().to_string()))?;
        file.write_all(rendered.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        if let Some(file) = self.file.as_mut() {
            file.flush().await?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Publishes records to a Kafka-style topic-mapped broker.
pub struct KafkaSink {
    producer: Arc<FutureProducer>,
    topic_mapping: std::collections::BTreeMap<String, String>,
    default_topic: Option<String>,
}

impl KafkaSink {
    /// Build a Kafka producer from the sink's `kafka_brokers`/SASL config.
    pub fn connect(
        kafka_brokers: &str,
        topic_mapping: std::collections::BTreeMap<String, String>,
        default_topic: Option<String>,
        security_protocol: Option<&str>,
        sasl_mechanism: Option<&str>,
        sasl_plain_username: Option<&str>,
        sasl_plain_password: Option<&str>,
    ) -> Result<Self, SinkError> {
        let mut config = ClientConfig::new();
        let _ = config.set("bootstrap.servers", kafka_brokers);
        if let Some(protocol) = security_protocol {
            let _ = config.set("security.protocol", protocol);
        }
        if let Some(mechanism) = sasl_mechanism {
            let _ = config.set("sasl.mechanisms", mechanism);
        }
        if let Some(username) = sasl_plain_username {
            let _ = config.set("sasl.username", username);
        }
        if let Some(password) = sasl_plain_password {
            let _ = config.set("sasl.password", password);
        }

        let producer: FutureProducer = config.create().map_err(|e| SinkError::Kafka(e.to_string()))?;
        Ok(Self { producer: Arc::new(producer), topic_mapping, default_topic })
    }

    fn topic_for<'a>(&'a self, event_type: &'a str) -> Option<&'a str> {
        self.topic_mapping
            .get(event_type)
            .map(String::as_str)
            .or(self.default_topic.as_deref())
    }
}

impl Sink for KafkaSink {
    async fn send(&mut self, record: &EmittedRecord) -> Result<(), SinkError> {
        let Some(topic) = self.topic_for(&record.event_type) else {
            warn!(event_type = %record.event_type, "no topic mapping or default_topic; dropping record");
            return Ok(());
        };
        let payload = serde_json::to_vec(record)?;
        let delivery = self
            .producer
            .send(
                FutureRecord::<(), Vec<u8>>::to(topic).payload(&payload),
                std::time::Duration::from_secs(5),
            )
            .await;
        if let Err((kafka_error, _)) = delivery {
            error!(topic, error = %kafka_error, "kafka delivery failed");
            return Err(SinkError::Kafka(kafka_error.to_string()));
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.producer
            .flush(std::time::Duration::from_secs(10))
            .map_err(|e| SinkError::Kafka(e.to_string()))
    }

    fn name(&self) -> &str {
        "kafka"
    }
}
