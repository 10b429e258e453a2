//! Records, metadata and query results of the memory collection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A scalar metadata value, as accepted by the vector database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Str(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Str(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Int(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

/// Metadata attached to a record.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A stored memory. Immutable once added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub created_at: i64,
}

/// Nearest-neighbor results, one group per query text.
///
/// Group `i` of every field belongs to query `i`; within a group hits are
/// ordered from nearest to farthest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    pub documents: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<Metadata>>,
    /// Cosine distance (`1 - similarity`).
    pub distances: Vec<Vec<f32>>,
}

impl QueryResult {
    /// Documents of the first result group, if the store returned any group.
    pub fn first_documents(self) -> Vec<String> {
        self.documents.into_iter().next().unwrap_or_default()
    }

    pub(crate) fn push_group(&mut self, hits: Vec<(MemoryRecord, f32)>) {
        let mut ids = Vec::with_capacity(hits.len());
        let mut documents = Vec::with_capacity(hits.len());
        let mut metadatas = Vec::with_capacity(hits.len());
        let mut distances = Vec::with_capacity(hits.len());
        for (record, distance) in hits {
            ids.push(record.id);
            documents.push(record.content);
            metadatas.push(record.metadata);
            distances.push(distance);
        }
        self.ids.push(ids);
        self.documents.push(documents);
        self.metadatas.push(metadatas);
        self.distances.push(distances);
    }
}
