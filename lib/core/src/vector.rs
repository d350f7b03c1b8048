use serde::{Deserialize, Serialize};

/// A fixed-length embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self { data: vec![0.0; dim] }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// Cosine similarity; 0.0 when either side has zero norm or dimensions differ.
    #[inline]
    pub fn cosine_similarity(&self, other: &Vector) -> f32 {
        cosine_similarity(&self.data, &other.data)
    }

    /// Euclidean distance
    #[inline]
    pub fn l2_distance(&self, other: &Vector) -> f32 {
        crate::simd::l2_distance_simd(&self.data, &other.data)
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        crate::simd::norm_simd(&self.data)
    }

    /// Element-wise mean of a set of equal-dimension slices.
    ///
    /// Returns `None` for an empty input. Slices whose dimension differs from
    /// the first one are ignored.
    pub fn mean<'a, I>(vectors: I) -> Option<Vector>
    where
        I: IntoIterator<Item = &'a [f32]>,
    {
        let mut iter = vectors.into_iter();
        let first = iter.next()?;
        let mut sum = first.to_vec();
        let mut count = 1usize;

        for v in iter {
            if v.len() != sum.len() {
                continue;
            }
            for (acc, x) in sum.iter_mut().zip(v) {
                *acc += x;
            }
            count += 1;
        }

        let inv = 1.0 / count as f32;
        for x in &mut sum {
            *x *= inv;
        }
        Some(Vector::new(sum))
    }
}

/// Slice-level cosine similarity shared by the vector index and rerankers.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let norm_a = crate::simd::norm_simd(a);
    let norm_b = crate::simd::norm_simd(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    crate::simd::dot_product_simd(a, b) / (norm_a * norm_b)
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Vector::new(data)
    }
}
