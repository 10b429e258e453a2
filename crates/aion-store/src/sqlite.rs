//! SQLite-backed vector collection with in-memory cosine search.
//!
//! Documents and metadata live in `records`; embeddings are stored uint8
//! quantized in `record_embeddings` and mirrored into a normalized
//! `(N, dim)` matrix so a query is one matrix-vector product.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aion_core::{Error, Result};
use aion_infer::EmbedderBackend;
use ndarray::{Array1, Array2, Axis};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::collection::VectorCollection;
use crate::embedding::QuantizedVector;
use crate::schema::SCHEMA_SQL;
use crate::types::{Metadata, MemoryRecord, QueryResult};

/// File name of the database inside the store directory.
pub const DB_FILE: &str = "aion.sqlite3";

pub struct SqliteCollection {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    name: String,
    embedder: Arc<dyn EmbedderBackend>,
    embedding_matrix: Mutex<EmbeddingMatrix>,
}

struct EmbeddingMatrix {
    /// Normalized embeddings, shape (N, dim).
    matrix: Array2<f32>,
    /// Record IDs corresponding to each row.
    record_ids: Vec<String>,
}

impl SqliteCollection {
    /// Open or create `name` inside the store at `db_dir`.
    pub fn open(
        db_dir: impl AsRef<Path>,
        name: &str,
        embedder: Arc<dyn EmbedderBackend>,
    ) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join(DB_FILE);

        let conn = Self::create_connection(&db_path)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let dim = embedder.dimension();
        let collection = Self {
            conn: Mutex::new(conn),
            db_path,
            name: name.to_string(),
            embedder,
            embedding_matrix: Mutex::new(EmbeddingMatrix {
                matrix: Array2::zeros((0, dim)),
                record_ids: Vec::new(),
            }),
        };

        collection.load_embedding_matrix()?;

        info!(
            "Collection '{}' opened: {} records, embedder={}, dim={}, path={}",
            collection.name,
            collection.count()?,
            collection.embedder.name(),
            dim,
            collection.db_path.display()
        );

        Ok(collection)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    /// Path of the underlying database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Fetch a single record by id.
    pub fn get(&self, id: &str) -> Result<Option<MemoryRecord>> {
        let conn = self.conn.lock();
        Self::fetch_record(&conn, &self.name, id)
    }

    fn fetch_record(conn: &Connection, collection: &str, id: &str) -> Result<Option<MemoryRecord>> {
        conn.prepare_cached(
            "SELECT id, document, metadata_json, created_at FROM records \
             WHERE id = ?1 AND collection = ?2",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .query_row(params![id, collection], |row| {
            let metadata_json: String = row.get(2)?;
            Ok(MemoryRecord {
                id: row.get(0)?,
                content: row.get(1)?,
                metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
                created_at: row.get(3)?,
            })
        })
        .optional()
        .map_err(|e| Error::Database(e.to_string()))
    }

    /// Newest `limit` records of the collection.
    fn recent_records(conn: &Connection, collection: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, document, metadata_json, created_at FROM records \
                 WHERE collection = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![collection, limit as i64], |row| {
                let metadata_json: String = row.get(2)?;
                Ok(MemoryRecord {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
                    created_at: row.get(3)?,
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        let records = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(records)
    }

    // ---------------------------------------------------------------
    // Embedding matrix
    // ---------------------------------------------------------------

    fn load_embedding_matrix(&self) -> Result<()> {
        let mut record_ids = Vec::new();
        let mut rows: Vec<Array1<f32>> = Vec::new();

        {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT e.record_id, e.embedding, e.scale, e.offset_val \
                     FROM record_embeddings e \
                     JOIN records r ON r.id = e.record_id \
                     WHERE r.collection = ?1 \
                     ORDER BY r.created_at, r.rowid",
                )
                .map_err(|e| Error::Database(e.to_string()))?;

            let loaded = stmt
                .query_map(params![self.name], |row| {
                    let scale: f64 = row.get(2)?;
                    let offset: f64 = row.get(3)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        QuantizedVector {
                            bytes: row.get(1)?,
                            scale: scale as f32,
                            offset: offset as f32,
                        },
                    ))
                })
                .map_err(|e| Error::Database(e.to_string()))?;

            for row in loaded {
                let (id, quantized) = row.map_err(|e| Error::Database(e.to_string()))?;
                let embedding = quantized.decode();
                if embedding.len() != self.embedder.dimension() {
                    warn!("Skipping record {} with dimension {}", id, embedding.len());
                    continue;
                }
                record_ids.push(id);
                rows.push(embedding);
            }
        }

        let dim = self.embedder.dimension();
        let mut matrix = Array2::zeros((rows.len(), dim));
        for (i, emb) in rows.iter().enumerate() {
            let norm = emb.dot(emb).sqrt();
            if norm > 1e-9 {
                matrix.row_mut(i).assign(&(emb / norm));
            }
        }

        debug!("Loaded {} embeddings for '{}'", record_ids.len(), self.name);
        let mut mat = self.embedding_matrix.lock();
        mat.matrix = matrix;
        mat.record_ids = record_ids;
        Ok(())
    }

    fn append_to_matrix(&self, appended: Vec<(String, Array1<f32>)>) -> Result<()> {
        let mut mat = self.embedding_matrix.lock();
        for (id, embedding) in appended {
            let norm = embedding.dot(&embedding).sqrt();
            if norm < 1e-9 {
                continue;
            }
            let normalized = embedding / norm;
            mat.matrix
                .push(Axis(0), normalized.view())
                .map_err(|e| Error::Internal(format!("Matrix append failed: {}", e)))?;
            mat.record_ids.push(id);
        }
        Ok(())
    }

    /// Top-k (record id, cosine similarity) for a normalized query vector.
    fn nearest(&self, query: &Array1<f32>, k: usize) -> Vec<(String, f32)> {
        let mat = self.embedding_matrix.lock();
        if mat.matrix.nrows() == 0 || k == 0 {
            return Vec::new();
        }

        let similarities = mat.matrix.dot(query);
        let mut indexed: Vec<(usize, f32)> = similarities.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        indexed.truncate(k);

        indexed
            .into_iter()
            .map(|(i, s)| (mat.record_ids[i].clone(), s))
            .collect()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl VectorCollection for SqliteCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, ids: &[String], documents: &[String], metadatas: &[Metadata]) -> Result<()> {
        if ids.len() != documents.len() || ids.len() != metadatas.len() {
            return Err(Error::Storage(format!(
                "Mismatched add batch: {} ids, {} documents, {} metadatas",
                ids.len(),
                documents.len(),
                metadatas.len()
            )));
        }

        let embeddings: Vec<Option<Array1<f32>>> = documents
            .iter()
            .map(|d| self.embedder.embed(d).map(|r| r.embedding))
            .collect();

        let now = now_millis();
        let mut appended = Vec::new();
        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction().map_err(|e| Error::Database(e.to_string()))?;
            for (((id, document), metadata), embedding) in
                ids.iter().zip(documents).zip(metadatas).zip(embeddings)
            {
                let metadata_json = serde_json::to_string(metadata)?;
                tx.execute(
                    "INSERT INTO records (id, collection, document, metadata_json, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id, self.name, document, metadata_json, now],
                )
                .map_err(|e| Error::Database(e.to_string()))?;

                match embedding {
                    Some(embedding) => {
                        let q = QuantizedVector::encode(&embedding);
                        tx.execute(
                            "INSERT INTO record_embeddings (record_id, embedding, scale, offset_val) \
                             VALUES (?1, ?2, ?3, ?4)",
                            params![id, q.bytes, q.scale, q.offset],
                        )
                        .map_err(|e| Error::Database(e.to_string()))?;
                        appended.push((id.clone(), embedding));
                    }
                    None => debug!("Record {} has no embeddable text; stored unindexed", id),
                }
            }
            tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        }

        self.append_to_matrix(appended)
    }

    fn query(&self, query_texts: &[String], n_results: usize) -> Result<QueryResult> {
        let mut result = QueryResult::default();

        for text in query_texts {
            let Some(query) = self.embedder.embed(text) else {
                // Nothing to compare against; every record is equally far.
                let conn = self.conn.lock();
                let hits = Self::recent_records(&conn, &self.name, n_results)?
                    .into_iter()
                    .map(|record| (record, 1.0))
                    .collect();
                result.push_group(hits);
                continue;
            };

            let nearest = self.nearest(&query.embedding, n_results);
            let conn = self.conn.lock();
            let mut hits = Vec::with_capacity(nearest.len());
            for (id, similarity) in nearest {
                if let Some(record) = Self::fetch_record(&conn, &self.name, &id)? {
                    hits.push((record, 1.0 - similarity));
                }
            }
            result.push_group(hits);
        }

        Ok(result)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM records WHERE collection = ?1",
                params![self.name],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_infer::HashingEmbedder;
    use tempfile::TempDir;

    fn test_collection(dir: &TempDir, name: &str) -> SqliteCollection {
        SqliteCollection::open(dir.path(), name, Arc::new(HashingEmbedder::new(384))).unwrap()
    }

    fn add_one(collection: &SqliteCollection, id: &str, text: &str) {
        collection
            .add(&[id.to_string()], &[text.to_string()], &[Metadata::new()])
            .unwrap();
    }

    #[test]
    fn test_add_and_get_record() {
        let dir = TempDir::new().unwrap();
        let collection = test_collection(&dir, "aion_memories");

        let mut metadata = Metadata::new();
        metadata.insert("role".into(), "user".into());
        collection
            .add(&["m1".into()], &["I live in Lisbon".into()], &[metadata.clone()])
            .unwrap();

        let record = collection.get("m1").unwrap().unwrap();
        assert_eq!(record.content, "I live in Lisbon");
        assert_eq!(record.metadata, metadata);
        assert_eq!(collection.count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_content_creates_new_records() {
        let dir = TempDir::new().unwrap();
        let collection = test_collection(&dir, "aion_memories");

        add_one(&collection, "a", "same text");
        add_one(&collection, "b", "same text");

        assert_eq!(collection.count().unwrap(), 2);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let collection = test_collection(&dir, "aion_memories");

        add_one(&collection, "a", "first");
        let err = collection
            .add(&["a".into()], &["second".into()], &[Metadata::new()])
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_query_orders_by_similarity() {
        let dir = TempDir::new().unwrap();
        let collection = test_collection(&dir, "aion_memories");

        add_one(&collection, "1", "My dog is called Rex");
        add_one(&collection, "2", "I prefer tea over coffee");
        add_one(&collection, "3", "The deploy script lives in ops");

        let result = collection
            .query(&["what is my dog called".into()], 3)
            .unwrap();

        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].len(), 3);
        assert_eq!(result.documents[0][0], "My dog is called Rex");
        assert!(result.distances[0][0] <= result.distances[0][1]);
        assert!(result.distances[0][1] <= result.distances[0][2]);
    }

    #[test]
    fn test_query_limits_results() {
        let dir = TempDir::new().unwrap();
        let collection = test_collection(&dir, "aion_memories");
        for i in 0..5 {
            add_one(&collection, &format!("id{}", i), &format!("memory number {}", i));
        }

        let result = collection.query(&["memory".into()], 3).unwrap();
        assert_eq!(result.ids[0].len(), 3);
    }

    #[test]
    fn test_query_empty_collection() {
        let dir = TempDir::new().unwrap();
        let collection = test_collection(&dir, "aion_memories");

        let result = collection.query(&["anything".into()], 3).unwrap();
        assert_eq!(result.documents, vec![Vec::<String>::new()]);
        assert!(result.first_documents().is_empty());
    }

    #[test]
    fn test_wordless_document_round_trips() {
        let dir = TempDir::new().unwrap();
        let collection = test_collection(&dir, "aion_memories");

        add_one(&collection, "greeting", "hello");
        add_one(&collection, "thumbs", "👍");
        add_one(&collection, "punct", "?!");

        assert_eq!(collection.count().unwrap(), 3);
        for text in ["👍", "?!"] {
            let found = collection.query(&[text.into()], 3).unwrap().first_documents();
            assert_eq!(found.first().map(String::as_str), Some(text));
        }
    }

    #[test]
    fn test_wordless_query_returns_min_k_count() {
        let dir = TempDir::new().unwrap();
        let collection = test_collection(&dir, "aion_memories");
        add_one(&collection, "a", "hello");
        add_one(&collection, "b", "the launch is friday");

        assert_eq!(collection.query(&["?".into()], 3).unwrap().ids[0].len(), 2);
        assert_eq!(collection.query(&["...".into()], 1).unwrap().ids[0].len(), 1);
    }

    #[test]
    fn test_blank_query_falls_back_to_recent_records() {
        let dir = TempDir::new().unwrap();
        let collection = test_collection(&dir, "aion_memories");
        add_one(&collection, "a", "first memory");
        add_one(&collection, "b", "second memory");
        add_one(&collection, "c", "third memory");

        let result = collection.query(&["   ".into()], 2).unwrap();
        assert_eq!(result.ids[0], vec!["c".to_string(), "b".to_string()]);
        assert!(result.distances[0].iter().all(|d| (*d - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_collections_are_isolated() {
        let dir = TempDir::new().unwrap();
        let memories = test_collection(&dir, "aion_memories");
        let other = test_collection(&dir, "scratch");

        add_one(&memories, "m", "remember the milk");
        assert_eq!(other.count().unwrap(), 0);
        assert!(other.query(&["milk".into()], 3).unwrap().first_documents().is_empty());
    }

    #[test]
    fn test_embeddings_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let collection = test_collection(&dir, "aion_memories");
            add_one(&collection, "persisted", "the launch date is friday");
        }

        let reopened = test_collection(&dir, "aion_memories");
        let docs = reopened
            .query(&["when is the launch".into()], 1)
            .unwrap()
            .first_documents();
        assert_eq!(docs, vec!["the launch date is friday".to_string()]);
    }
}
