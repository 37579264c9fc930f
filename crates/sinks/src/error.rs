use thiserror::Error;

/// Sink faults (spec.md §7 "Sink faults").
///
/// Never fatal to the run: the fan-out logs these with context and the
/// sink that raised one is marked unhealthy, but the scheduler proceeds to
/// the next event on every remaining sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing to stdout or a file failed.
    #[error("I/O error writing to sink: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be serialized to JSON.
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The Kafka-style producer could not be constructed or could not
    /// deliver a message.
    #[error("kafka producer error: {0}")]
    Kafka(String),

    /// The sink's queue has been closed (the worker task has exited).
    #[error("sink `{0}` queue is closed")]
    QueueClosed(String),
}
