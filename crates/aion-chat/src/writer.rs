//! Background memory write-back.
//!
//! Handlers enqueue writes and move on; a single worker task drains the
//! queue into the memory store. Nobody awaits a write, and a failed write
//! is logged and dropped. Responses never see it.

use aion_store::{MemoryStore, Metadata};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A memory waiting to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryWrite {
    pub content: String,
    pub metadata: Metadata,
}

/// Sending half of the write-back queue.
#[derive(Debug, Clone)]
pub struct MemoryWriter {
    tx: mpsc::UnboundedSender<MemoryWrite>,
}

impl MemoryWriter {
    /// Create a writer and the receiver its worker will drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MemoryWrite>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a write. Returns immediately; never fails the caller.
    pub fn schedule(&self, content: String, metadata: Metadata) {
        if self.tx.send(MemoryWrite { content, metadata }).is_err() {
            warn!("Memory writer is not running; dropping memory");
        }
    }
}

/// Start the background memory writer task.
pub fn start_memory_writer(
    memory: MemoryStore,
    mut rx: mpsc::UnboundedReceiver<MemoryWrite>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Background memory writer started");
        while let Some(write) = rx.recv().await {
            match memory.add_memory(&write.content, write.metadata).await {
                Ok(id) => debug!("Memory {} written", id),
                Err(e) => error!("Memory write failed: {}", e),
            }
        }
        info!("Background memory writer stopped");
    })
}
