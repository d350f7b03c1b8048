//! Preference reranking.
//!
//! Scores are shifted by cosine similarity to the centroid of the user's
//! liked items and the centroid of their disliked items, then re-sorted
//! descending. Only the passed-in ranking is touched; indexes are read-only.

use furnix_core::vector::cosine_similarity;
use furnix_core::{
    Catalog, Error, ItemId, ItemSummary, Ranked, Result, ScoreKind, ScoreOrder, Scored, Vector,
};

/// Anything in a ranked list that can be traced back to a catalog item.
pub trait HasItemId {
    fn item_id(&self) -> &ItemId;
}

impl HasItemId for ItemId {
    fn item_id(&self) -> &ItemId {
        self
    }
}

impl HasItemId for ItemSummary {
    fn item_id(&self) -> &ItemId {
        &self.item_id
    }
}

/// Liked and disliked centroids resolved against a catalog.
/// Unknown ids are skipped; an empty side contributes nothing.
#[derive(Debug, Clone, Default)]
pub struct Preferences {
    liked: Option<Vector>,
    disliked: Option<Vector>,
}

impl Preferences {
    pub fn resolve<S: AsRef<str>>(catalog: &Catalog, liked: &[S], disliked: &[S]) -> Self {
        Self {
            liked: catalog.centroid(liked),
            disliked: catalog.centroid(disliked),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.liked.is_none() && self.disliked.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreferenceReranker {
    pub liked_weight: f32,
    pub disliked_weight: f32,
}

impl Default for PreferenceReranker {
    fn default() -> Self {
        Self {
            liked_weight: 0.25,
            disliked_weight: -0.25,
        }
    }
}

impl PreferenceReranker {
    pub fn new(liked_weight: f32, disliked_weight: f32) -> Self {
        Self {
            liked_weight,
            disliked_weight,
        }
    }

    /// Score delta for one embedding.
    pub fn adjustment(&self, embedding: &[f32], prefs: &Preferences) -> f32 {
        let liked = prefs
            .liked
            .as_ref()
            .map_or(0.0, |c| cosine_similarity(embedding, c.as_slice()));
        let disliked = prefs
            .disliked
            .as_ref()
            .map_or(0.0, |c| cosine_similarity(embedding, c.as_slice()));
        self.liked_weight * liked + self.disliked_weight * disliked
    }

    /// Rerank a descending (similarity) list. Ascending (distance) rankings
    /// are rejected with [`Error::ScoreOrderMismatch`].
    pub fn rerank<T, S>(
        &self,
        ranked: Ranked<T>,
        liked: &[S],
        disliked: &[S],
        catalog: &Catalog,
    ) -> Result<Ranked<T>>
    where
        T: HasItemId,
        S: AsRef<str>,
    {
        let prefs = Preferences::resolve(catalog, liked, disliked);
        self.rerank_with(ranked, &prefs, catalog)
    }

    pub fn rerank_with<T: HasItemId>(
        &self,
        ranked: Ranked<T>,
        prefs: &Preferences,
        catalog: &Catalog,
    ) -> Result<Ranked<T>> {
        if ranked.order() != ScoreOrder::Descending {
            return Err(Error::ScoreOrderMismatch {
                expected: ScoreOrder::Descending,
                actual: ranked.order(),
            });
        }

        let entries = ranked
            .into_iter()
            .map(|scored| {
                let delta = catalog
                    .get(scored.item.item_id().as_str())
                    .map_or(0.0, |item| self.adjustment(item.embedding.as_slice(), prefs));
                Scored::new(scored.item, scored.score + delta)
            })
            .collect();

        Ok(Ranked::new(ScoreKind::PreferenceAdjusted, entries))
    }
}
