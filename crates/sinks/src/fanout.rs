//! Sink fan-out: routes every emitted record to all enabled sinks, each on
//! its own bounded-queue worker task (spec.md §4.8, §5).

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::SinkError;
use crate::record::EmittedRecord;
use crate::sink::Sink;

/// Channel capacity for each sink's queue. Small enough that a genuinely
/// stuck sink applies back-pressure promptly; large enough to absorb
/// ordinary jitter without stalling the scheduler on every tick.
const DEFAULT_QUEUE_CAPACITY: usize = 256;

struct Worker {
    name: String,
    sender: mpsc::Sender<EmittedRecord>,
    handle: JoinHandle<()>,
}

/// Owns one worker task per enabled sink and fans every record out to all
/// of them. Back-pressure on one sink's queue blocks only the scheduler's
/// enqueue to *that* sink (spec.md §5's "block on slowest" reference
/// behavior): `dispatch` awaits each sink's `send` concurrently via
/// `tokio::spawn`, so the overall call resolves only once the slowest
/// enabled sink has accepted the record, while faster sinks were not
/// additionally delayed waiting on it.
pub struct SinkFanout {
    workers: Vec<Worker>,
}

impl SinkFanout {
    /// Spawn one worker task per sink in `sinks`, each reading off its own
    /// bounded channel and forwarding to `Sink::send`.
    pub fn spawn(sinks: Vec<Box<dyn Sink>>) -> Self {
        let mut workers = Vec::with_capacity(sinks.len());
        for mut sink in sinks {
            let (sender, mut receiver) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
            let name = sink.name().to_string();
            let task_name = name.clone();
            let handle = tokio::spawn(async move {
                while let Some(record) = receiver.recv().await {
                    if let Err(error) = sink.send(&record).await {
                        error!(sink = %task_name, event_type = %record.event_type, %error, "sink delivery failed");
                    }
                }
                if let Err(error) = sink.flush().await {
                    error!(sink = %task_name, %error, "sink flush on shutdown failed");
                }
            });
            workers.push(Worker { name, sender, handle });
        }
        Self { workers }
    }

    /// Enqueue `record` on every sink's queue, awaiting all of them
    /// concurrently. A closed queue (its worker panicked or already
    /// shut down) is logged and skipped — it does not abort the run.
    pub async fn dispatch(&self, record: EmittedRecord) {
        let mut sends = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let sender = worker.sender.clone();
            let record = record.clone();
            let name = worker.name.clone();
            sends.push(tokio::spawn(async move {
                if sender.send(record).await.is_err() {
                    error!(sink = %name, "sink queue closed, dropping record");
                }
            }));
        }
        for send in sends {
            let _ = send.await;
        }
    }

    /// Close every sink's queue and wait for its worker to drain and flush.
    /// Must be called before the process exits for an orderly shutdown
    /// (spec.md §4.8 "Flush-on-shutdown").
    pub async fn shutdown(self) -> Result<(), SinkError> {
        for worker in self.workers {
            drop(worker.sender);
            if worker.handle.await.is_err() {
                error!(sink = %worker.name, "sink worker task panicked during shutdown");
            } else {
                info!(sink = %worker.name, "sink flushed and shut down");
            }
        }
        Ok(())
    }
}
