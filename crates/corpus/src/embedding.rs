//! Deterministic feature-hash embeddings.
//!
//! Corpus documents may carry precomputed vectors; when they don't, the
//! store derives one here. Tokens are lowercased, hashed with SHA-256
//! into a fixed number of buckets, counted, and L2-normalized. The same
//! embedder builds query vectors from slot values, so similarity is
//! comparable and fully reproducible.

use sha2::{Digest, Sha256};

/// Embedding dimensionality. Small on purpose: the corpus is tiny and
/// ranking only needs a stable relative ordering.
pub const EMBEDDING_DIM: usize = 64;

/// Embed a text into a normalized `EMBEDDING_DIM`-dimensional vector.
pub fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0f32; EMBEDDING_DIM];

    for token in tokenize(text) {
        let bucket = token_bucket(&token);
        vector[bucket] += 1.0;
    }

    l2_normalize(&mut vector);
    vector
}

/// Cosine similarity between two vectors. Mismatched or zero-length
/// inputs score 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    f64::from(dot / (na * nb))
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(|t| t.to_lowercase())
}

fn token_bucket(token: &str) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    // First 8 bytes as a big-endian integer, reduced mod the dimension.
    let mut acc = 0u64;
    for byte in &digest[..8] {
        acc = (acc << 8) | u64::from(*byte);
    }
    (acc % EMBEDDING_DIM as u64) as usize
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic() {
        let a = embed("polarized marathon training high volume");
        let b = embed("polarized marathon training high volume");
        assert_eq!(a, b);
    }

    #[test]
    fn self_similarity_is_one() {
        let v = embed("threshold tempo intervals");
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_texts_score_higher_than_unrelated() {
        let marathon = embed("marathon long run aerobic endurance volume");
        let similar = embed("marathon endurance long aerobic");
        let unrelated = embed("sprint track power starts blocks");
        assert!(cosine(&marathon, &similar) > cosine(&marathon, &unrelated));
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let v = embed("");
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(cosine(&v, &embed("anything")), 0.0);
    }
}
