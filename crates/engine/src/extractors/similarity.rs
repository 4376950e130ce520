//! Integer-scale embedding similarity
//!
//! Similarity between two vectors is cosine similarity scaled by 10,000,
//! which for real status embeddings clusters in the 6,500–8,000 range.
//! The averaged-similarity features subtract the 6,500 baseline; the
//! similar-status counters use a 7,300 threshold. The downstream weight
//! table was fit against these constants.

use fedirank_common::models::Status;
use fedirank_common::EMBEDDING_DIM;

/// Baseline subtracted from averaged similarity features
pub const SIMILARITY_BASELINE: f32 = 6500.0;

/// A status counts as "similar" at or above this value
pub const SIMILARITY_THRESHOLD: f32 = 7300.0;

/// Sentinel returned when the vectors are not comparable (length
/// mismatch, i.e. one side has no embedding)
pub const SIMILARITY_NO_SIGNAL: f32 = 1.0;

/// Elementwise mean over the statuses that carry embeddings. Returns the
/// zero vector when none do, which the similarity gate then treats as no
/// signal.
pub fn mean_embedding(statuses: &[Status]) -> Vec<f32> {
    let embedded: Vec<&Status> = statuses.iter().filter(|s| s.has_embedding()).collect();
    if embedded.is_empty() {
        return vec![0.0; EMBEDDING_DIM];
    }

    let mut sums = vec![0.0f32; embedded[0].embedding.len()];
    for status in &embedded {
        for (sum, value) in sums.iter_mut().zip(&status.embedding) {
            *sum += value;
        }
    }
    let count = embedded.len() as f32;
    for sum in sums.iter_mut() {
        *sum /= count;
    }
    sums
}

/// Cosine similarity scaled to the integer range. Returns the no-signal
/// sentinel for incomparable vectors and 0 when either side has zero
/// norm.
pub fn integer_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return SIMILARITY_NO_SIGNAL;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt()) * 10_000.0
}

/// Averaged-similarity feature: similarity between the mean embedding of
/// the interacted statuses and the candidate's embedding, baseline
/// adjusted. The gate covers both the sentinel and the zero-norm case.
pub fn similarity_feature(interacted: &[Status], candidate_status: &Status) -> i64 {
    let average = mean_embedding(interacted);
    let similarity = integer_similarity(&average, &candidate_status.embedding);
    if similarity <= SIMILARITY_NO_SIGNAL {
        return 0;
    }
    (similarity - SIMILARITY_BASELINE).round() as i64
}

/// Count of interacted statuses whose embedding clears the similarity
/// threshold against the candidate's.
pub fn similar_status_count(interacted: &[Status], candidate_status: &Status) -> i64 {
    interacted
        .iter()
        .filter(|status| {
            integer_similarity(&status.embedding, &candidate_status.embedding)
                >= SIMILARITY_THRESHOLD
        })
        .count() as i64
}
