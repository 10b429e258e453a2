//! Embedding engine trait and implementations.
//!
//! - `HashingEmbedder`: signed feature hashing over word and trigram features
//! - `CachedEmbedder`: wraps any backend with a `QueryCache`
//! - `OnnxEmbedder`: all-MiniLM-L6-v2 via ONNX Runtime (`onnx` feature)

use ndarray::Array1;

use crate::cache::QueryCache;

/// Result of an embedding operation.
pub struct EmbeddingResult {
    /// L2-normalized float32 embedding vector.
    pub embedding: Array1<f32>,
    /// Whether this was served from cache.
    pub cached: bool,
}

/// Trait for embedding backends.
pub trait EmbedderBackend: Send + Sync {
    /// Generate an embedding for a text string.
    /// Returns None if no embedding could be produced.
    fn embed(&self, text: &str) -> Option<EmbeddingResult>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;
}

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic lexical embedder.
///
/// Every lowercase alphanumeric word and each character trigram of the
/// padded word is hashed (FNV-1a) into a bucket with a sign taken from a
/// high bit of the hash. Identical texts always map to identical vectors,
/// and texts sharing words land close in cosine space. Text without any
/// words is hashed from its characters; only blank text yields `None`.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn add_feature(&self, vector: &mut Array1<f32>, feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let bucket = (hash % self.dim as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl EmbedderBackend for HashingEmbedder {
    fn embed(&self, text: &str) -> Option<EmbeddingResult> {
        let mut vector = Array1::<f32>::zeros(self.dim);
        let mut features = 0usize;

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            self.add_feature(&mut vector, &word, WORD_WEIGHT);
            features += 1;

            let padded: Vec<char> = format!("^{}$", word).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut vector, &trigram, TRIGRAM_WEIGHT);
            }
        }

        // No words (emoji, punctuation): fall back to the raw characters.
        if features == 0 {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }

            for c in trimmed.chars().filter(|c| !c.is_whitespace()) {
                self.add_feature(&mut vector, c.encode_utf8(&mut [0; 4]), WORD_WEIGHT);
            }
            let padded: Vec<char> = format!("^{}$", trimmed).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut vector, &trigram, TRIGRAM_WEIGHT);
            }
        }

        let mut norm = vector.dot(&vector).sqrt();
        if norm < 1e-9 {
            // Features cancelled out; keep the text addressable by its own hash.
            vector.fill(0.0);
            self.add_feature(&mut vector, text.trim(), WORD_WEIGHT);
            norm = 1.0;
        }

        Some(EmbeddingResult {
            embedding: vector / norm,
            cached: false,
        })
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &'static str {
        "hashing"
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

/// Memoizes another backend's embeddings by exact input text.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: QueryCache,
}

impl<E: EmbedderBackend> CachedEmbedder<E> {
    pub fn new(inner: E, cache: QueryCache) -> Self {
        Self { inner, cache }
    }
}

impl<E: EmbedderBackend> EmbedderBackend for CachedEmbedder<E> {
    fn embed(&self, text: &str) -> Option<EmbeddingResult> {
        if let Some(embedding) = self.cache.get(text) {
            return Some(EmbeddingResult {
                embedding,
                cached: true,
            });
        }

        let result = self.inner.embed(text)?;
        self.cache.put(text.to_string(), result.embedding.clone());
        Some(result)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
