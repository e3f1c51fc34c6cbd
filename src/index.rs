//! Flat in-memory vector index with exhaustive nearest-neighbor search.
//!
//! Corpora are small (tens to low hundreds of chunks per document), so the
//! index scans every vector on each query instead of approximating. The
//! index is built once per document with [`VectorIndex::insert_all`] and is
//! read-only afterwards, which is what makes concurrent lock-free reads
//! through the document cache safe.

use crate::chunker::Chunk;
use crate::types::QaError;

/// Owns a contiguous collection of embedding vectors and the parallel
/// mapping from vector position to [`Chunk`].
#[derive(Debug)]
pub struct VectorIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// One-time bulk load of vectors and their chunks.
    ///
    /// The index dimension is taken from the first vector; every other
    /// vector must match it. There is no update or delete: after this call
    /// the index is immutable.
    ///
    /// # Errors
    ///
    /// [`QaError::DimensionMismatch`] when any vector's length differs from
    /// the first, or when `vectors` and `chunks` disagree in length.
    pub fn insert_all(vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<Self, QaError> {
        if vectors.len() != chunks.len() {
            return Err(QaError::DimensionMismatch {
                expected: chunks.len(),
                got: vectors.len(),
            });
        }
        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(QaError::DimensionMismatch {
                expected: dim,
                got: bad.len(),
            });
        }
        Ok(Self {
            dim,
            vectors,
            chunks,
        })
    }

    /// Dimension shared by every vector in the index.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true when the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The indexed chunks, in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Returns up to `k` chunks ordered by ascending L2 distance to
    /// `query`, fewer when the index holds fewer entries.
    ///
    /// # Errors
    ///
    /// [`QaError::DimensionMismatch`] when the query dimension differs from
    /// the index dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<&Chunk>, QaError> {
        if query.len() != self.dim {
            return Err(QaError::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (squared_l2(query, v), i))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, i)| &self.chunks[i])
            .collect())
    }
}

/// Squared L2 distance. The square root is omitted since it does not change
/// the ordering.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Averages `vectors` element-wise into a single query vector.
///
/// Used to merge the embeddings of a question's synonym variants into one
/// robust search vector.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let mut mean = vec![0.0f32; first.len()];
    for vector in vectors {
        for (slot, value) in mean.iter_mut().zip(vector.iter()) {
            *slot += value;
        }
    }
    let n = vectors.len() as f32;
    for slot in &mut mean {
        *slot /= n;
    }
    mean
}
