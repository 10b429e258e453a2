//! Sentence embeddings from an all-MiniLM-L6-v2 ONNX export.
//!
//! Produces the same 384-dimensional, L2-normalized vectors the external
//! vector database computes by default. Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use aion_core::{Error, Result};
    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::{info, warn};

    use crate::embedder::{EmbedderBackend, EmbeddingResult};
    use crate::EMBEDDING_DIM;

    /// Maximum sequence length for the model.
    const MAX_SEQ_LEN: usize = 256;

    pub struct OnnxEmbedder {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
    }

    impl OnnxEmbedder {
        /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
        pub fn load(model_dir: &Path) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            for required in [&model_path, &tokenizer_path] {
                if !required.exists() {
                    return Err(Error::Inference(format!(
                        "Missing model file: {}",
                        required.display()
                    )));
                }
            }

            // With load-dynamic, ORT_DYLIB_PATH must point to libonnxruntime.so
            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| Error::Inference(format!("Session builder failed: {}", e)))?
                .with_intra_threads(2)
                .map_err(|e| Error::Inference(format!("Failed to set threads: {}", e)))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::Inference(format!("Failed to load ONNX model: {}", e)))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::Inference(format!("Failed to load tokenizer: {}", e)))?;

            info!("ONNX embedder loaded from {}", model_dir.display());

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
            })
        }

        fn infer(&self, text: &str) -> Result<Array1<f32>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| Error::Inference(format!("Tokenization failed: {}", e)))?;

            let seq_len = encoding.get_ids().len().min(MAX_SEQ_LEN);
            let ids: Vec<i64> = encoding.get_ids()[..seq_len].iter().map(|&v| v as i64).collect();
            let mask: Vec<i64> = encoding.get_attention_mask()[..seq_len]
                .iter()
                .map(|&v| v as i64)
                .collect();
            let type_ids = vec![0i64; seq_len];

            let tensor = |data: Vec<i64>| {
                Tensor::from_array(([1usize, seq_len], data))
                    .map_err(|e| Error::Inference(format!("Tensor creation failed: {}", e)))
            };
            let inputs = ort::inputs![tensor(ids)?, tensor(mask.clone())?, tensor(type_ids)?];

            let mut session = self.session.lock();
            let outputs = session
                .run(inputs)
                .map_err(|e| Error::Inference(format!("ONNX inference failed: {}", e)))?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Inference(format!("Bad output tensor: {}", e)))?;
            let dims: Vec<i64> = shape.iter().copied().collect();

            match dims.as_slice() {
                // [1, seq_len, dim] token embeddings
                [1, _, dim] => Ok(mean_pool(data, &mask, *dim as usize)),
                // [1, dim] pooled sentence embedding
                [1, dim] => Ok(Array1::from_vec(data[..*dim as usize].to_vec())),
                other => Err(Error::Inference(format!("Unexpected output shape: {:?}", other))),
            }
        }
    }

    fn mean_pool(data: &[f32], mask: &[i64], dim: usize) -> Array1<f32> {
        let mut pooled = Array1::<f32>::zeros(dim);
        let mut weight = 0.0f32;
        for (token, &m) in mask.iter().enumerate() {
            if m == 0 {
                continue;
            }
            let row = &data[token * dim..(token + 1) * dim];
            for (acc, v) in pooled.iter_mut().zip(row) {
                *acc += v;
            }
            weight += 1.0;
        }
        if weight > 0.0 {
            pooled /= weight;
        }
        pooled
    }

    impl EmbedderBackend for OnnxEmbedder {
        fn embed(&self, text: &str) -> Option<EmbeddingResult> {
            let embedding = match self.infer(text) {
                Ok(e) => e,
                Err(e) => {
                    warn!("{}", e);
                    return None;
                }
            };
            let norm = embedding.dot(&embedding).sqrt();
            if norm < 1e-9 {
                return None;
            }
            Some(EmbeddingResult {
                embedding: embedding / norm,
                cached: false,
            })
        }

        fn dimension(&self) -> usize {
            EMBEDDING_DIM
        }

        fn name(&self) -> &'static str {
            "onnx-minilm"
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxEmbedder;
