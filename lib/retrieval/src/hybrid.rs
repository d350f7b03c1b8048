//! Boolean filtering followed by vector ranking over the surviving items.

use tracing::debug;

use furnix_core::{
    query, CatalogIndexes, IdSet, ItemId, ItemSummary, Ranked, Result, ScoreKind, Vector,
    VectorIndex,
};

pub struct HybridRetriever<'a> {
    indexes: &'a CatalogIndexes,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(indexes: &'a CatalogIndexes) -> Self {
        Self { indexes }
    }

    /// Items matching `boolean_query`, ranked by ascending Euclidean distance
    /// to `ranking_vector`. At most `k` results, never outside the match set.
    pub fn retrieve(
        &self,
        boolean_query: &str,
        ranking_vector: &Vector,
        k: usize,
    ) -> Result<Ranked<ItemSummary>> {
        self.retrieve_in(&self.indexes.vectors, boolean_query, ranking_vector, k)
    }

    /// Same as [`HybridRetriever::retrieve`] but ranked in another embedding
    /// space, e.g. the image index.
    pub fn retrieve_in(
        &self,
        space: &VectorIndex,
        boolean_query: &str,
        ranking_vector: &Vector,
        k: usize,
    ) -> Result<Ranked<ItemSummary>> {
        let candidates = query::evaluate(boolean_query, &self.indexes.terms);
        debug!(
            query = boolean_query,
            candidates = candidates.len(),
            "boolean filter evaluated"
        );
        if candidates.is_empty() {
            return Ok(Ranked::empty(ScoreKind::EuclideanDistance));
        }

        let restricted = space.restrict(&candidates);
        let hits = restricted.search(ranking_vector, k.min(candidates.len()))?;
        self.summarize(hits)
    }

    /// Nearest items by cosine similarity, skipping anything scoring at or
    /// above `threshold` (the query item itself and exact duplicates).
    pub fn similar(&self, query: &Vector, k: usize, threshold: f32) -> Result<Ranked<ItemId>> {
        similar_in(&self.indexes.vectors, query, k, threshold)
    }

    /// [`HybridRetriever::similar`] restricted to a candidate pool.
    pub fn similar_within(
        &self,
        candidates: &IdSet,
        query: &Vector,
        k: usize,
        threshold: f32,
    ) -> Result<Ranked<ItemId>> {
        if candidates.is_empty() {
            return Ok(Ranked::empty(ScoreKind::CosineSimilarity));
        }
        similar_in(&self.indexes.vectors.restrict(candidates), query, k, threshold)
    }

    pub fn summarize(&self, ranked: Ranked<ItemId>) -> Result<Ranked<ItemSummary>> {
        ranked.try_map(|id| self.indexes.catalog.summary(id.as_str()))
    }
}

/// Cosine top-`k` over `index` with the self-match guard applied.
pub(crate) fn similar_in(
    index: &VectorIndex,
    query: &Vector,
    k: usize,
    threshold: f32,
) -> Result<Ranked<ItemId>> {
    let mut hits = index.search_cosine(query, k.saturating_add(1))?;
    hits.retain(|hit| hit.score < threshold);
    hits.truncate(k);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use furnix_core::{Catalog, Item};

    // id1 and id3 are wood; id2 is closest after id1 but fails the filter
    fn indexes() -> CatalogIndexes {
        let catalog = Catalog::from_items(vec![
            Item::new("id1", "wood chair", Vector::new(vec![1.0, 0.0])).with_image_ref("img-1"),
            Item::new("id2", "metal chair", Vector::new(vec![0.0, 1.0])),
            Item::new("id3", "wood stool", Vector::new(vec![1.0, 0.01])),
        ])
        .unwrap();
        CatalogIndexes::build(catalog).unwrap()
    }

    #[test]
    fn test_wood_scenario() {
        let indexes = indexes();
        let results = HybridRetriever::new(&indexes)
            .retrieve("wood", &Vector::new(vec![1.0, 0.0]), 2)
            .unwrap();

        let order: Vec<&str> = results.items().map(|s| s.item_id.as_str()).collect();
        assert_eq!(order, vec!["id1", "id3"]);
        assert_eq!(results.kind(), ScoreKind::EuclideanDistance);
        assert_eq!(results.first().unwrap().score, 0.0);
        assert_eq!(results.first().unwrap().item.image_id.as_deref(), Some("img-1"));
        assert_eq!(results.first().unwrap().item.description, "wood chair");
    }

    #[test]
    fn test_never_escapes_candidate_set() {
        let indexes = indexes();
        let retriever = HybridRetriever::new(&indexes);
        for q in ["wood", "metal", "chair", "wood NOT stool", "chair OR stool"] {
            let allowed = query::evaluate(q, &indexes.terms);
            for probe in [[0.0, 1.0], [1.0, 0.0], [-1.0, -1.0]] {
                let results = retriever.retrieve(q, &Vector::new(probe.to_vec()), 10).unwrap();
                assert!(results.len() <= allowed.len());
                assert!(results.items().all(|s| allowed.contains(&s.item_id)));
            }
        }
    }

    #[test]
    fn test_empty_match_short_circuits() {
        let indexes = indexes();
        let retriever = HybridRetriever::new(&indexes);
        assert!(retriever.retrieve("marble", &Vector::new(vec![1.0, 0.0]), 5).unwrap().is_empty());
        // the short-circuit happens before the dimension check
        assert!(retriever.retrieve("", &Vector::new(vec![1.0]), 5).unwrap().is_empty());
    }

    #[test]
    fn test_similar_drops_self_match() {
        let indexes = indexes();
        let retriever = HybridRetriever::new(&indexes);
        let results = retriever.similar(&Vector::new(vec![1.0, 0.0]), 2, 0.99).unwrap();
        // id1 (1.0) and id3 (~0.99995) are both above the threshold
        let order: Vec<&str> = results.items().map(ItemId::as_str).collect();
        assert_eq!(order, vec!["id2"]);
        assert_eq!(results.kind(), ScoreKind::CosineSimilarity);

        let loose = retriever.similar(&Vector::new(vec![1.0, 0.0]), 2, 1.01).unwrap();
        let order: Vec<&str> = loose.items().map(ItemId::as_str).collect();
        assert_eq!(order, vec!["id1", "id3"]);
    }
}
