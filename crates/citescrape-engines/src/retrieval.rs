//! Ranking chunks against a query
//!
//! Vectors come from feature hashing over lower-cased word tokens, so no
//! embedding model or network call is needed. Good enough to pick the
//! handful of chunks worth sending to the LLM.

/// Dimensions of the hashed vectors
pub const DEFAULT_DIMENSIONS: usize = 1024;

/// Bag-of-words vectoriser using the hashing trick
#[derive(Debug, Clone, Copy)]
pub struct HashingVectorizer {
    dimensions: usize,
}

impl Default for HashingVectorizer {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashingVectorizer {
    /// Create a vectoriser with `dimensions` buckets
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Term-frequency vector of `text`
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        for token in tokens(text) {
            let bucket = (fnv1a(token.as_bytes()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
}

// Stable across runs, unlike the std hasher
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Cosine similarity of two equally sized vectors; 0.0 when undefined
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A chunk with its source and similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Document the chunk came from
    pub source: String,
    /// Chunk text
    pub text: String,
    /// Cosine similarity to the query
    pub score: f32,
}

/// The `top_k` chunks most similar to `query`, best first
///
/// Ties keep document order.
pub fn top_k(
    vectorizer: &HashingVectorizer,
    query: &str,
    chunks: Vec<(String, String)>,
    k: usize,
) -> Vec<ScoredChunk> {
    let query_vector = vectorizer.vectorize(query);
    let mut scored: Vec<ScoredChunk> = chunks
        .into_iter()
        .map(|(source, text)| {
            let score = cosine_similarity(&query_vector, &vectorizer.vectorize(&text));
            ScoredChunk { source, text, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}
