//! Memory-augmented chat with streaming LLM providers.
//!
//! A request's latest message is used to recall related memories, which
//! are merged into the system prompt before the conversation is streamed
//! through the selected provider. The latest message is then remembered
//! in the background.

pub mod config;
pub mod handler;
pub mod prompt;
pub mod providers;
pub mod registry;
pub mod sse;
pub mod types;
pub mod writer;

pub use handler::ChatHandler;
pub use providers::{Provider, ProviderKind, TextStream};
pub use registry::ProviderRegistry;
pub use types::*;
pub use writer::{start_memory_writer, MemoryWrite, MemoryWriter};
