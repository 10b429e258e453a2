//! AION Store — the vector collection that holds memories, and the
//! memory client the chat handler talks to.
//!
//! `VectorCollection` is the add/query seam to the vector database.
//! `SqliteCollection` implements it on disk; `MemoryStore` is the thin
//! facade exposing `add_memory` / `search_memories`.

pub mod collection;
pub mod embedding;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use collection::VectorCollection;
pub use memory::{MemoryStore, DEFAULT_SEARCH_RESULTS};
pub use sqlite::SqliteCollection;
pub use types::*;
