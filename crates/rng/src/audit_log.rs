use serde::{Serialize, Deserialize};
use super::rng_stream::RngSubstream;

/// Record of a single RNG draw, kept for debugging and replay verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RngDrawRecord {
    /// The event sequence number in effect when this draw occurred.
    pub tick: u64,
    /// The sub-stream this draw was made from.
    pub substream: RngSubstream,
    /// Stream id within the sub-stream.
    pub stream_id: u64,
    /// Caller-supplied description of the draw site, for audit trails.
    pub callsite: String,
    /// The raw value drawn (floats are logged via their bit pattern).
    pub value: u64,
}

/// Append-only log of every RNG draw made during a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RngAuditLog {
    records: Vec<RngDrawRecord>,
}

impl RngAuditLog {
    /// Create an empty audit log.
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    /// Append a draw record.
    pub fn record_draw(
        &mut self,
        tick: u64,
        substream: RngSubstream,
        stream_id: u64,
        callsite: &str,
        value: u64,
    ) {
        self.records.push(RngDrawRecord {
            tick,
            substream,
            stream_id,
            callsite: callsite.to_string(),
            value,
        });
    }

    /// All records, in draw order.
    pub fn records(&self) -> &[RngDrawRecord] {
        &self.records
    }

    /// Records made during a given event sequence number.
    pub fn records_by_tick(&self, tick: u64) -> Vec<&RngDrawRecord> {
        self.records.iter().filter(|r| r.tick == tick).collect()
    }

    /// Records made from a given sub-stream.
    pub fn records_by_substream(&self, substream: RngSubstream) -> Vec<&RngDrawRecord> {
        self.records.iter().filter(|r| r.substream == substream).collect()
    }

    /// Drop all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of records logged.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no draws have been logged yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
