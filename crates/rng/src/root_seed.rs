use std::collections::BTreeMap;
use serde::{Serialize, Deserialize, Serializer, Deserializer};
use super::rng_stream::{RngStream, RngSubstream};
use super::audit_log::RngAuditLog;

/// Root-seed management for all named sub-streams.
///
/// Centralizes stream derivation and audit logging so the rest of the
/// engine never constructs a `ChaCha20Rng` directly.
#[derive(Debug, Clone, PartialEq)]
pub struct RootSeed {
    seed: [u8; 32],
    streams: BTreeMap<(RngSubstream, u64), RngStream>,
    audit_log: RngAuditLog,
}

impl Serialize for RootSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Only the seed is persisted; streams are reconstructed lazily.
        serializer.serialize_bytes(&self.seed)
    }
}

impl<'de> Deserialize<'de> for RootSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seed: [u8; 32] = Deserialize::deserialize(deserializer)?;
        Ok(RootSeed::from_seed_bytes(seed))
    }
}

impl RootSeed {
    /// Derive a root seed from the spec's `random_seed`.
    pub fn from_random_seed(seed: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        let _ = hasher.update(&seed.to_le_bytes());
        let derived_seed = *hasher.finalize().as_bytes();

        Self {
            seed: derived_seed,
            streams: BTreeMap::new(),
            audit_log: RngAuditLog::new(),
        }
    }

    fn from_seed_bytes(seed: [u8; 32]) -> Self {
        Self {
            seed,
            streams: BTreeMap::new(),
            audit_log: RngAuditLog::new(),
        }
    }

    /// Get or lazily create the stream for a (sub-stream, stream id) pair.
    pub fn stream(
        &mut self,
        substream: RngSubstream,
        stream_id: u64,
    ) -> &mut RngStream {
        let key = (substream, stream_id);
        self.streams.entry(key).or_insert_with(|| {
            RngStream::new(self.seed, substream, stream_id)
        })
    }

    /// The derived 32-byte seed underlying all streams.
    pub fn seed_bytes(&self) -> [u8; 32] {
        self.seed
    }

    /// Drop all lazily-created streams and the audit log. Used between test runs.
    pub fn reset(&mut self) {
        self.streams.clear();
    }

    /// Number of streams created so far.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Whether a given stream has already been created.
    pub fn has_stream(&self, substream: RngSubstream, stream_id: u64) -> bool {
        self.streams.contains_key(&(substream, stream_id))
    }

    /// Read-only access to the audit log.
    pub fn audit_log(&self) -> &RngAuditLog {
        &self.audit_log
    }

    /// Mutable access to the audit log.
    pub fn audit_log_mut(&mut self) -> &mut RngAuditLog {
        &mut self.audit_log
    }
}
