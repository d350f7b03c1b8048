use ahash::AHashMap;
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::catalog::Catalog;
use crate::item::ItemId;
use crate::ranking::{Ranked, ScoreKind, ScoreOrder, Scored};
use crate::term_index::IdSet;
use crate::{Error, Result, Vector};

/// Below this many rows a sequential scan beats rayon's fork/join overhead.
const PARALLEL_THRESHOLD: usize = 4096;

/// Exact nearest-neighbour index over a dense, row-major embedding matrix.
///
/// Row `i` of the matrix belongs to `ids[i]`. Per-row L2 norms are kept next
/// to the matrix so cosine scoring does not recompute them per query.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    ids: Vec<ItemId>,
    dim: usize,
    matrix: Vec<f32>,
    norms: Vec<f32>,
    positions: AHashMap<ItemId, usize>,
}

impl VectorIndex {
    /// Build from parallel sequences of embeddings and ids.
    pub fn build(embeddings: Vec<Vector>, ids: Vec<ItemId>) -> Result<Self> {
        if embeddings.len() != ids.len() {
            return Err(Error::IndexMismatch {
                embeddings: embeddings.len(),
                ids: ids.len(),
            });
        }

        let dim = embeddings.first().map(Vector::dim).unwrap_or(0);
        if dim == 0 && !ids.is_empty() {
            return Err(Error::InvalidDimension {
                expected: 1,
                actual: 0,
            });
        }
        let mut matrix = Vec::with_capacity(dim * embeddings.len());
        for embedding in &embeddings {
            if embedding.dim() != dim {
                return Err(Error::InvalidDimension {
                    expected: dim,
                    actual: embedding.dim(),
                });
            }
            matrix.extend_from_slice(embedding.as_slice());
        }

        let norms = matrix
            .chunks_exact(dim.max(1))
            .map(crate::simd::norm_simd)
            .collect();
        Self::assemble(ids, dim, matrix, norms)
    }

    /// Index the primary embedding of every catalog item, in catalog order.
    pub fn from_catalog(catalog: &Catalog) -> Result<Self> {
        let (embeddings, ids): (Vec<Vector>, Vec<ItemId>) = catalog
            .iter()
            .map(|item| (item.embedding.clone(), item.id.clone()))
            .unzip();
        Self::build(embeddings, ids)
    }

    /// Index the image embeddings of the items that have one.
    /// `None` when no item carries an image embedding.
    pub fn from_catalog_images(catalog: &Catalog) -> Result<Option<Self>> {
        let (embeddings, ids): (Vec<Vector>, Vec<ItemId>) = catalog
            .iter()
            .filter_map(|item| {
                item.image_embedding
                    .as_ref()
                    .map(|e| (e.clone(), item.id.clone()))
            })
            .unzip();
        if ids.is_empty() {
            return Ok(None);
        }
        Self::build(embeddings, ids).map(Some)
    }

    /// Reassemble a persisted index, validating every invariant.
    pub fn from_parts(ids: Vec<ItemId>, dim: usize, matrix: Vec<f32>, norms: Vec<f32>) -> Result<Self> {
        let rows = if dim == 0 { 0 } else { matrix.len() / dim };
        if dim != 0 && matrix.len() % dim != 0 {
            return Err(Error::InvalidDimension {
                expected: dim,
                actual: matrix.len() % dim,
            });
        }
        if rows != ids.len() {
            return Err(Error::IndexMismatch {
                embeddings: rows,
                ids: ids.len(),
            });
        }
        if norms.len() != ids.len() {
            return Err(Error::IndexMismatch {
                embeddings: norms.len(),
                ids: ids.len(),
            });
        }
        Self::assemble(ids, dim, matrix, norms)
    }

    fn assemble(ids: Vec<ItemId>, dim: usize, matrix: Vec<f32>, norms: Vec<f32>) -> Result<Self> {
        let mut positions = AHashMap::with_capacity(ids.len());
        for (row, id) in ids.iter().enumerate() {
            if positions.insert(id.clone(), row).is_some() {
                return Err(Error::DuplicateItem(id.to_string()));
            }
        }
        Ok(Self {
            ids,
            dim,
            matrix,
            norms,
            positions,
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    #[inline]
    pub fn matrix(&self) -> &[f32] {
        &self.matrix
    }

    #[inline]
    pub fn norms(&self) -> &[f32] {
        &self.norms
    }

    #[inline]
    fn row(&self, row: usize) -> &[f32] {
        let start = row * self.dim;
        &self.matrix[start..start + self.dim]
    }

    pub fn embedding(&self, id: &str) -> Option<&[f32]> {
        self.positions.get(id).map(|&row| self.row(row))
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// The `k` ids closest to `query` by Euclidean distance, ascending.
    /// Returns every entry when `k` exceeds the index size.
    pub fn search(&self, query: &Vector, k: usize) -> Result<Ranked<ItemId>> {
        self.check_dim(query)?;
        let q = query.as_slice();
        let scores = self.score_rows(|row| crate::simd::l2_distance_simd(q, self.row(row)));
        Ok(self.top_k(scores, k, ScoreKind::EuclideanDistance))
    }

    /// The `k` ids most similar to `query` by cosine similarity, descending.
    pub fn search_cosine(&self, query: &Vector, k: usize) -> Result<Ranked<ItemId>> {
        self.check_dim(query)?;
        let q = query.as_slice();
        let q_norm = crate::simd::norm_simd(q);
        let scores = self.score_rows(|row| {
            let denom = q_norm * self.norms[row];
            if denom == 0.0 {
                0.0
            } else {
                crate::simd::dot_product_simd(q, self.row(row)) / denom
            }
        });
        Ok(self.top_k(scores, k, ScoreKind::CosineSimilarity))
    }

    /// A new index over the subset of rows whose id is in `subset`, keeping
    /// this index's row order and the original ids.
    pub fn restrict(&self, subset: &IdSet) -> VectorIndex {
        let mut ids = Vec::with_capacity(subset.len().min(self.len()));
        let mut matrix = Vec::with_capacity(ids.capacity() * self.dim);
        let mut norms = Vec::with_capacity(ids.capacity());
        let mut positions = AHashMap::with_capacity(ids.capacity());

        for (row, id) in self.ids.iter().enumerate() {
            if subset.contains(id) {
                positions.insert(id.clone(), ids.len());
                ids.push(id.clone());
                matrix.extend_from_slice(self.row(row));
                norms.push(self.norms[row]);
            }
        }

        VectorIndex {
            ids,
            dim: self.dim,
            matrix,
            norms,
            positions,
        }
    }

    fn check_dim(&self, query: &Vector) -> Result<()> {
        if !self.is_empty() && query.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: query.dim(),
            });
        }
        Ok(())
    }

    fn score_rows<F>(&self, score: F) -> Vec<(usize, f32)>
    where
        F: Fn(usize) -> f32 + Sync,
    {
        if self.len() >= PARALLEL_THRESHOLD {
            (0..self.len()).into_par_iter().map(|row| (row, score(row))).collect()
        } else {
            (0..self.len()).map(|row| (row, score(row))).collect()
        }
    }

    fn top_k(&self, mut scores: Vec<(usize, f32)>, k: usize, kind: ScoreKind) -> Ranked<ItemId> {
        let k = k.min(scores.len());
        if k == 0 {
            return Ranked::empty(kind);
        }

        // total order: better score first, then lower row for stable ties
        let key = |&(row, score): &(usize, f32)| match kind.order() {
            ScoreOrder::Ascending => (OrderedFloat(score), row),
            ScoreOrder::Descending => (OrderedFloat(-score), row),
        };

        if k < scores.len() {
            scores.select_nth_unstable_by_key(k - 1, key);
            scores.truncate(k);
        }
        scores.sort_unstable_by_key(key);

        let entries = scores
            .into_iter()
            .map(|(row, score)| Scored::new(self.ids[row].clone(), score))
            .collect();
        Ranked::new(kind, entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ItemId> {
        names.iter().map(|n| ItemId::new(*n)).collect()
    }

    fn index() -> VectorIndex {
        VectorIndex::build(
            vec![
                Vector::new(vec![1.0, 0.0]),
                Vector::new(vec![0.0, 1.0]),
                Vector::new(vec![1.0, 0.01]),
                Vector::new(vec![-1.0, 0.0]),
            ],
            ids(&["id1", "id2", "id3", "id4"]),
        )
        .unwrap()
    }

    fn order(ranked: &Ranked<ItemId>) -> Vec<&str> {
        ranked.items().map(ItemId::as_str).collect()
    }

    #[test]
    fn test_build_validates_lengths_and_dims() {
        let mismatch = VectorIndex::build(vec![Vector::new(vec![1.0])], ids(&["a", "b"]));
        assert!(matches!(mismatch, Err(Error::IndexMismatch { embeddings: 1, ids: 2 })));

        let ragged = VectorIndex::build(
            vec![Vector::new(vec![1.0]), Vector::new(vec![1.0, 2.0])],
            ids(&["a", "b"]),
        );
        assert!(matches!(ragged, Err(Error::InvalidDimension { .. })));

        let hollow = VectorIndex::build(vec![Vector::new(vec![]), Vector::new(vec![])], ids(&["a", "b"]));
        assert!(matches!(
            hollow,
            Err(Error::InvalidDimension { expected: 1, actual: 0 })
        ));
        assert!(VectorIndex::build(vec![], vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_exact_vector_is_top_match() {
        let index = index();
        for (i, id) in ["id1", "id2", "id3", "id4"].iter().enumerate() {
            let query = Vector::from_slice(&index.matrix()[i * 2..i * 2 + 2]);
            let results = index.search(&query, 1).unwrap();
            let top = results.first().unwrap();
            assert_eq!(top.item.as_str(), *id);
            assert_eq!(top.score, 0.0);
        }
    }

    #[test]
    fn test_search_ascending_distance() {
        let index = index();
        let results = index.search(&Vector::new(vec![1.0, 0.0]), 3).unwrap();
        assert_eq!(order(&results), vec!["id1", "id3", "id2"]);
        assert_eq!(results.kind(), ScoreKind::EuclideanDistance);
        let scores: Vec<f32> = results.iter().map(|s| s.score).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = index();
        let results = index.search(&Vector::new(vec![0.0, 0.0]), 100).unwrap();
        assert_eq!(results.len(), 4);
        assert!(index.search(&Vector::new(vec![0.0, 0.0]), 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_cosine_descending() {
        let index = index();
        let results = index.search_cosine(&Vector::new(vec![2.0, 0.0]), 4).unwrap();
        assert_eq!(order(&results), vec!["id1", "id3", "id2", "id4"]);
        assert!((results.first().unwrap().score - 1.0).abs() < 1e-6);
        assert_eq!(results.kind(), ScoreKind::CosineSimilarity);
    }

    #[test]
    fn test_query_dimension_checked() {
        let index = index();
        assert!(matches!(
            index.search(&Vector::new(vec![1.0, 0.0, 0.0]), 1),
            Err(Error::InvalidDimension { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_restrict_preserves_ids() {
        let index = index();
        let subset: IdSet = ids(&["id2", "id3", "ghost"]).into_iter().collect();
        let sub = index.restrict(&subset);

        assert_eq!(sub.len(), 2);
        assert_eq!(sub.ids(), &ids(&["id2", "id3"])[..]);
        assert_eq!(sub.embedding("id3"), index.embedding("id3"));

        let results = sub.search(&Vector::new(vec![1.0, 0.0]), 5).unwrap();
        assert_eq!(order(&results), vec!["id3", "id2"]);
    }

    #[test]
    fn test_from_parts_round_trip_and_validation() {
        let index = index();
        let rebuilt = VectorIndex::from_parts(
            index.ids().to_vec(),
            index.dim(),
            index.matrix().to_vec(),
            index.norms().to_vec(),
        )
        .unwrap();
        assert_eq!(rebuilt.len(), index.len());

        let bad = VectorIndex::from_parts(ids(&["a"]), 2, vec![1.0, 0.0, 0.0, 1.0], vec![1.0, 1.0]);
        assert!(matches!(bad, Err(Error::IndexMismatch { embeddings: 2, ids: 1 })));
    }

    #[test]
    fn test_parallel_scan_matches_sequential() {
        let n = PARALLEL_THRESHOLD + 10;
        let embeddings: Vec<Vector> = (0..n)
            .map(|i| Vector::new(vec![(i as f32).cos(), (i as f32).sin()]))
            .collect();
        let names: Vec<ItemId> = (0..n).map(|i| ItemId::new(format!("p{}", i))).collect();
        let index = VectorIndex::build(embeddings, names).unwrap();

        let query = Vector::new(vec![(42.0f32).cos(), (42.0f32).sin()]);
        let results = index.search(&query, 1).unwrap();
        assert_eq!(results.first().unwrap().item.as_str(), "p42");
    }
}
