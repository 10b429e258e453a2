//! AION Infer — text embeddings for the memory collection.
//!
//! `EmbedderBackend` abstracts over embedding generation. With the `onnx`
//! feature and model files present, `OnnxEmbedder` produces
//! all-MiniLM-L6-v2 sentence embeddings. Otherwise `HashingEmbedder`
//! provides deterministic lexical vectors of the same dimension.

pub mod cache;
pub mod embedder;
pub mod onnx_embedder;

pub use cache::QueryCache;
pub use embedder::{CachedEmbedder, EmbedderBackend, EmbeddingResult, HashingEmbedder};

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;

use std::path::Path;
use std::sync::Arc;

/// Dimension shared by every backend so stored vectors stay comparable.
pub const EMBEDDING_DIM: usize = 384;

/// Create the best available embedder for the given model directory.
///
/// Tries ONNX first (if feature enabled and model files present),
/// falls back to the hashing embedder.
pub fn create_embedder(model_dir: &Path) -> Arc<dyn EmbedderBackend> {
    #[cfg(feature = "onnx")]
    {
        match OnnxEmbedder::load(model_dir) {
            Ok(embedder) => {
                tracing::info!("Using ONNX embedder (dim={})", embedder.dimension());
                return Arc::new(CachedEmbedder::new(embedder, QueryCache::default_cache()));
            }
            Err(e) => {
                tracing::warn!("ONNX embedder unavailable: {}. Falling back to hashing.", e);
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::info!("ONNX feature disabled. Using hashing embedder.");
    }

    Arc::new(CachedEmbedder::new(
        HashingEmbedder::new(EMBEDDING_DIM),
        QueryCache::default_cache(),
    ))
}
