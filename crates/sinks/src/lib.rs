//! Egress fan-out for emitted records: stdout, file, and Kafka-style sinks
//! behind a single fan-out handle (spec.md §4.8, §6).

mod builder;
mod error;
mod fanout;
mod record;
mod sink;

pub use builder::build_sinks;
pub use error::SinkError;
pub use fanout::SinkFanout;
pub use record::EmittedRecord;
pub use sink::{FileSink, KafkaSink, Sink, StdoutSink};
