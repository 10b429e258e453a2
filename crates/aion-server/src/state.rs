//! Shared application state.

use std::sync::Arc;

use aion_chat::{ChatHandler, MemoryWrite, MemoryWriter, ProviderRegistry};
use aion_core::AionConfig;
use aion_store::{MemoryStore, VectorCollection};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: AionConfig,
    pub memory: MemoryStore,
    pub chat: ChatHandler,
    memory_rx: Mutex<Option<mpsc::UnboundedReceiver<MemoryWrite>>>,
}

impl AppState {
    pub fn new(config: AionConfig, collection: Arc<dyn VectorCollection>) -> Self {
        let memory = MemoryStore::new(collection);
        let (writer, rx) = MemoryWriter::channel();
        let registry = ProviderRegistry::new(config.providers.clone());
        let chat = ChatHandler::new(registry, memory.clone(), writer);

        Self {
            config,
            memory,
            chat,
            memory_rx: Mutex::new(Some(rx)),
        }
    }

    /// Take the memory-write receiver (can only be called once, by the worker).
    pub fn take_memory_rx(&self) -> Option<mpsc::UnboundedReceiver<MemoryWrite>> {
        self.memory_rx.lock().take()
    }
}
