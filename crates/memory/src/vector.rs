//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity, brute-force passage ranking, and the
//! little-endian blob encoding used to persist embeddings.

use folio_core::search::{Passage, PassageMatch};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 for empty, zero-norm, or mismatched-length inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank passages of one partition by cosine similarity to `query`.
///
/// Returns at most `top_k` matches, most similar first. No threshold is
/// applied here.
pub fn rank_passages<'a>(
    passages: impl IntoIterator<Item = &'a Passage>,
    query: &[f32],
    partition: &str,
    top_k: usize,
) -> Vec<PassageMatch> {
    let mut scored: Vec<PassageMatch> = passages
        .into_iter()
        .filter(|p| p.metadata.document_type == partition)
        .map(|p| PassageMatch {
            doc_id: p.id.clone(),
            text: p.text.clone(),
            similarity: cosine_similarity(&p.embedding, query),
            metadata: p.metadata.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

/// Serialize an embedding vector to little-endian bytes.
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Inverse of [`embedding_to_blob`]. Trailing bytes that do not form a
/// whole `f32` are ignored.
pub fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
