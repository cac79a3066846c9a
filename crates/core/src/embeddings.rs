pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 256;

/// Turns text into a fixed-size vector for similarity search. Implementations
/// must be deterministic so re-ingestion stays idempotent.
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Local, dependency-free embedder: counts hashed character trigrams into a
/// fixed number of buckets and L2-normalizes. Close spellings share most of
/// their trigrams, which is what fuzzy course-name resolution relies on.
#[derive(Debug, Clone, Copy)]
pub struct HashedTrigramEmbedder {
    dimensions: usize,
}

impl HashedTrigramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for HashedTrigramEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

impl Embedder for HashedTrigramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut buckets = vec![0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let bytes = lowered.as_bytes();

        if bytes.len() < 3 {
            if !bytes.is_empty() {
                buckets[(fnv1a(bytes) % self.dimensions as u64) as usize] = 1.0;
            }
            return buckets;
        }

        for trigram in bytes.windows(3) {
            let bucket = (fnv1a(trigram) % self.dimensions as u64) as usize;
            buckets[bucket] += 1.0;
        }

        let norm = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut buckets {
                *value /= norm;
            }
        }
        buckets
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::{Embedder, HashedTrigramEmbedder};

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashedTrigramEmbedder::default();
        assert_eq!(
            embedder.embed("Introduction to Python"),
            embedder.embed("Introduction to Python")
        );
    }

    #[test]
    fn embedding_has_configured_dimensions_and_unit_norm() {
        let embedder = HashedTrigramEmbedder::new(64);
        let vector = embedder.embed("retrieval augmented generation");
        assert_eq!(vector.len(), 64);

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn misspelling_stays_closer_than_unrelated_text() {
        let embedder = HashedTrigramEmbedder::default();
        let reference = embedder.embed("Intro to X");
        let misspelled = embedder.embed("itro to x");
        let unrelated = embedder.embed("quarterly budget report");

        assert!(cosine(&reference, &misspelled) > cosine(&reference, &unrelated));
    }

    #[test]
    fn tiny_inputs_do_not_panic() {
        let embedder = HashedTrigramEmbedder::default();
        assert_eq!(embedder.embed("").iter().sum::<f32>(), 0.0);
        assert_eq!(embedder.embed("ab").iter().sum::<f32>(), 1.0);
    }
}
