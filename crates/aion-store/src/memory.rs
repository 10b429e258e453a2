//! Memory client: the facade the chat handler uses to remember and recall.

use std::sync::Arc;

use aion_core::{Error, Result};
use tracing::debug;

use crate::collection::VectorCollection;
use crate::types::Metadata;

/// Number of memories recalled per query unless the caller asks otherwise.
pub const DEFAULT_SEARCH_RESULTS: usize = 3;

/// Thin async facade over a [`VectorCollection`].
///
/// One instance is built at startup and shared by reference; it holds no
/// state besides the collection handle.
#[derive(Clone)]
pub struct MemoryStore {
    collection: Arc<dyn VectorCollection>,
}

impl MemoryStore {
    pub fn new(collection: Arc<dyn VectorCollection>) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &Arc<dyn VectorCollection> {
        &self.collection
    }

    /// Store `content` as a new memory under a fresh UUID and return the id.
    ///
    /// Every call creates a record, even for content already stored.
    pub async fn add_memory(&self, content: &str, metadata: Metadata) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let collection = self.collection.clone();
        let ids = vec![id.clone()];
        let documents = vec![content.to_string()];

        tokio::task::spawn_blocking(move || collection.add(&ids, &documents, &[metadata]))
            .await
            .map_err(|e| Error::Internal(format!("Memory write task failed: {}", e)))??;

        debug!("Stored memory {}", id);
        Ok(id)
    }

    /// Texts of the `n_results` memories nearest to `query`, nearest first.
    ///
    /// Relevance is whatever the collection's similarity says; there is no
    /// threshold here.
    pub async fn search_memories(&self, query: &str, n_results: usize) -> Result<Vec<String>> {
        let collection = self.collection.clone();
        let query_texts = vec![query.to_string()];

        let result =
            tokio::task::spawn_blocking(move || collection.query(&query_texts, n_results))
                .await
                .map_err(|e| Error::Internal(format!("Memory search task failed: {}", e)))??;

        Ok(result.first_documents())
    }
}
