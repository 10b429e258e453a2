//! The add/query seam to the vector database.

use aion_core::Result;

use crate::types::{Metadata, QueryResult};

/// A named collection of documents searchable by semantic similarity.
///
/// Implementations own embedding, indexing and ranking. Callers only add
/// documents and ask for nearest neighbors. Both operations are blocking;
/// async callers go through `spawn_blocking`.
pub trait VectorCollection: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// Add documents under caller-assigned ids. The three slices are parallel.
    fn add(&self, ids: &[String], documents: &[String], metadatas: &[Metadata]) -> Result<()>;

    /// Up to `n_results` nearest documents for each query text.
    fn query(&self, query_texts: &[String], n_results: usize) -> Result<QueryResult>;

    /// Number of records in the collection.
    fn count(&self) -> Result<usize>;
}
