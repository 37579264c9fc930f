use serde::{Serialize, Deserialize};
use super::chacha20::ChaCha20Rng;

/// Named sub-stream identifier for RNG isolation.
///
/// Each sub-stream gets its own isolated RNG derived from the root seed,
/// so that reordering unrelated components never perturbs another
/// component's output sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum RngSubstream {
    /// Scheduler tick decisions: scenario initiation, candidate weighted pick.
    Schedule = 0,
    /// Generator interpreter draws: nullable coin flips, choice/derived inputs.
    Generator = 1,
    /// Dependency resolver candidate selection among feasible entity instances.
    Selection = 2,
    /// Scenario initiation bindings and per-run loop counters.
    ScenarioInit = 3,
}

impl RngSubstream {
    /// String representation used for logging and audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            RngSubstream::Schedule => "schedule",
            RngSubstream::Generator => "generator",
            RngSubstream::Selection => "selection",
            RngSubstream::ScenarioInit => "scenario_init",
        }
    }
}

/// Isolated RNG stream for one named sub-stream.
///
/// Each stream maintains its own ChaCha20 state derived from a nonce
/// unique to (root seed, sub-stream, stream id).
#[derive(Debug, Clone, PartialEq)]
pub struct RngStream {
    substream: RngSubstream,
    stream_id: u64,
    rng: ChaCha20Rng,
}

impl RngStream {
    /// Create a new stream for a named sub-stream.
    ///
    /// Nonce = blake3(root_seed || substream_id || stream_id), first 12 bytes.
    pub fn new(
        root_seed: [u8; 32],
        substream: RngSubstream,
        stream_id: u64,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        let _ = hasher.update(&root_seed);
        let _ = hasher.update(&(substream as u64).to_le_bytes());
        let _ = hasher.update(&stream_id.to_le_bytes());
        let nonce_bytes = hasher.finalize();

        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&nonce_bytes.as_bytes()[0..12]);

        Self {
            substream,
            stream_id,
            rng: ChaCha20Rng::new(root_seed, nonce),
        }
    }

    /// Next 32-bit draw.
    pub fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    /// Next 64-bit draw.
    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Next f64 draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.next_f64()
    }

    /// The sub-stream this stream belongs to.
    pub fn substream(&self) -> RngSubstream {
        self.substream
    }

    /// The stream id within the sub-stream.
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }
}
