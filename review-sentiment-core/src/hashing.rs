use {
    std::{collections::HashMap, io::Cursor},
    ndarray::Array1,
    crate::normalizer::NormalizedToken,
};

pub fn hash_token(token: &str, buckets: u32) -> u32 {
    // reading from an in-memory cursor cannot fail
    murmur3::murmur3_32(&mut Cursor::new(token), 0).unwrap_or(0) % buckets.max(1)
}

/// Bucket counts of the normalized terms. Sentinels and negation-marked words are terms of
/// their own, sentence breaks are skipped.
pub fn term_counts(normalized: &str, buckets: u32) -> HashMap<u32, u32> {
    let mut counts = HashMap::new();

    for token in normalized.split_whitespace() {
        if NormalizedToken::parse(token) == NormalizedToken::SentenceBreak {
            continue;
        }
        *counts.entry(hash_token(token, buckets)).or_insert(0) += 1;
    }

    counts
}

/// L2 normalized tf-idf vector over `idf.len()` hashing buckets.
pub fn tfidf_vector(normalized: &str, idf: &Array1<f32>) -> Array1<f32> {
    let mut vector = Array1::zeros(idf.len());
    if idf.is_empty() {
        return vector;
    }
    let buckets = idf.len() as u32;

    let counts = term_counts(normalized, buckets);
    let total_terms: u32 = counts.values().sum();
    if total_terms == 0 {
        return vector;
    }

    for (bucket, count) in counts {
        let tf = (count as f32) / (total_terms as f32);
        vector[bucket as usize] = tf * idf[bucket as usize];
    }

    let norm = vector.dot(&vector).sqrt();
    if norm > 0.0 && norm.is_finite() {
        vector /= norm;
    }

    vector
}
