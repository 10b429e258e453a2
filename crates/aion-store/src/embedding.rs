//! uint8 quantization of stored embeddings.

use ndarray::Array1;

/// An embedding packed into one byte per dimension.
///
/// `value ≈ byte * scale + offset`, with `[min, max]` mapped onto `[0, 255]`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedVector {
    pub bytes: Vec<u8>,
    pub scale: f32,
    pub offset: f32,
}

impl QuantizedVector {
    pub fn encode(embedding: &Array1<f32>) -> Self {
        let (min, max) = embedding
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        if !min.is_finite() || max - min < 1e-9 {
            // Constant (or empty) vector
            return Self {
                bytes: vec![0; embedding.len()],
                scale: 0.0,
                offset: if min.is_finite() { min } else { 0.0 },
            };
        }

        let scale = (max - min) / 255.0;
        let bytes = embedding
            .iter()
            .map(|&v| ((v - min) / scale).round().clamp(0.0, 255.0) as u8)
            .collect();

        Self {
            bytes,
            scale,
            offset: min,
        }
    }

    pub fn decode(&self) -> Array1<f32> {
        self.bytes
            .iter()
            .map(|&b| b as f32 * self.scale + self.offset)
            .collect()
    }
}
