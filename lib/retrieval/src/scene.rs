//! Scene composition: "what goes with this item, given what is already in
//! the room".
//!
//! Each scene item is expanded into its nearest neighbours, every
//! combination of one neighbour per scene item becomes a candidate scene,
//! and candidates are scored by how close their centroid sits to the target
//! item. A random subset of the best candidates is returned so repeated
//! calls surface different but still compatible suggestions.

use ahash::AHashSet;
use itertools::Itertools;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use furnix_core::vector::cosine_similarity;
use furnix_core::{
    CatalogIndexes, Error, IdSet, Item, ItemId, ItemSummary, Ranked, Result, ScoreKind, Scored,
};

use crate::config::EngineConfig;
use crate::hybrid::{similar_in, HybridRetriever};
use crate::rerank::{PreferenceReranker, Preferences};

/// One suggested scene: the generated companions followed by the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedScene {
    pub items: Vec<ItemSummary>,
    pub score: f32,
}

pub struct SceneSampler<'a> {
    indexes: &'a CatalogIndexes,
    config: &'a EngineConfig,
}

impl<'a> SceneSampler<'a> {
    pub fn new(indexes: &'a CatalogIndexes, config: &'a EngineConfig) -> Self {
        Self { indexes, config }
    }

    fn reranker(&self) -> PreferenceReranker {
        PreferenceReranker::new(self.config.liked_weight, self.config.disliked_weight)
    }

    /// Sample compatible scenes for `target`.
    ///
    /// The target is dropped from `scene` and unknown scene ids are skipped.
    /// An empty scene yields no proposals. Proposals come back best first.
    pub fn goes_with_it<R, S>(
        &self,
        target: &str,
        liked: &[S],
        disliked: &[S],
        scene: &[S],
        rng: &mut R,
    ) -> Result<Vec<ProposedScene>>
    where
        R: Rng + ?Sized,
        S: AsRef<str>,
    {
        let catalog = &self.indexes.catalog;
        let target = catalog.require(target)?;
        let members = self.scene_members(&target.id, scene);
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let neighbors = members
            .iter()
            .map(|member| {
                similar_in(
                    &self.indexes.vectors,
                    &member.embedding,
                    self.config.scene_neighbors,
                    self.config.self_match_threshold,
                )
                .map(|hits| hits.items().cloned().collect::<Vec<_>>())
            })
            .collect::<Result<Vec<_>>>()?;

        let total = neighbors
            .iter()
            .fold(1u128, |acc, list| acc.saturating_mul(list.len() as u128));
        if total > self.config.max_candidate_scenes as u128 {
            return Err(Error::SceneTooLarge {
                candidates: total,
                limit: self.config.max_candidate_scenes,
            });
        }

        let scored: Vec<Scored<Vec<ItemId>>> = neighbors
            .iter()
            .map(|list| list.iter().cloned())
            .multi_cartesian_product()
            .filter_map(|combo| {
                let centroid = catalog.centroid(&combo)?;
                let score = cosine_similarity(target.embedding.as_slice(), centroid.as_slice());
                Some(Scored::new(combo, score))
            })
            .collect();
        debug!(
            item = %target.id,
            members = members.len(),
            candidates = scored.len(),
            "scored candidate scenes"
        );

        // top M by target similarity alone; preferences only reorder the sample
        let mut best = Ranked::new(ScoreKind::CosineSimilarity, scored);
        best.truncate(self.config.scene_candidates);

        let pool = best.into_entries();
        let amount = self.config.scene_sample_size.min(pool.len());
        let picked: AHashSet<usize> = rand::seq::index::sample(rng, pool.len(), amount)
            .into_iter()
            .collect();
        let sample: Ranked<Vec<ItemId>> = Ranked::new(
            ScoreKind::CosineSimilarity,
            pool.into_iter()
                .enumerate()
                .filter(|(i, _)| picked.contains(i))
                .map(|(_, scene)| scene)
                .collect(),
        );

        let prefs = Preferences::resolve(catalog, liked, disliked);
        let sample = if prefs.is_empty() {
            sample
        } else {
            let reranker = self.reranker();
            let adjusted = sample
                .into_iter()
                .map(|scene| {
                    let shift = catalog
                        .centroid(&scene.item)
                        .map(|c| reranker.adjustment(c.as_slice(), &prefs))
                        .unwrap_or(0.0);
                    Scored::new(scene.item, scene.score + shift)
                })
                .collect();
            Ranked::new(ScoreKind::PreferenceAdjusted, adjusted)
        };

        sample
            .into_iter()
            .map(|scene| {
                let mut items = scene
                    .item
                    .iter()
                    .map(|id| catalog.summary(id.as_str()))
                    .collect::<Result<Vec<_>>>()?;
                items.push(target.summary());
                Ok(ProposedScene {
                    items,
                    score: scene.score,
                })
            })
            .collect()
    }

    /// Items similar to `target` drawn from the items sharing one of its
    /// keywords, ranked against the centroid of the current scene and then
    /// adjusted by preferences.
    pub fn similar_with_scene<S: AsRef<str>>(
        &self,
        target: &str,
        liked: &[S],
        disliked: &[S],
        scene: &[S],
    ) -> Result<Ranked<ItemSummary>> {
        let empty = Ranked::empty(ScoreKind::PreferenceAdjusted);
        let target = self.indexes.catalog.require(target)?;

        let mut pool = IdSet::default();
        for keyword in target.keyword_list() {
            pool.extend(self.indexes.terms.lookup(keyword).iter().cloned());
        }
        if pool.is_empty() {
            return Ok(empty);
        }

        let Some(query) = self.indexes.catalog.centroid(scene) else {
            return Ok(empty);
        };

        let retriever = HybridRetriever::new(self.indexes);
        let hits = retriever.similar_within(
            &pool,
            &query,
            self.config.similar_items_k,
            self.config.self_match_threshold,
        )?;
        debug!(item = %target.id, pool = pool.len(), hits = hits.len(), "scene-aware similar");

        let reranked = self
            .reranker()
            .rerank(hits, liked, disliked, &self.indexes.catalog)?;
        retriever.summarize(reranked)
    }

    fn scene_members<S: AsRef<str>>(&self, target: &ItemId, scene: &[S]) -> Vec<&'a Item> {
        let mut seen = AHashSet::new();
        scene
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| *id != target.as_str() && seen.insert(id.to_string()))
            .filter_map(|id| self.indexes.catalog.get(id).map(|item| &**item))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use furnix_core::{Catalog, Vector};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(id: &str, keywords: &str, v: [f32; 2]) -> Item {
        Item::new(id, format!("{} item", id), Vector::new(v.to_vec())).with_keywords(keywords)
    }

    fn indexes() -> CatalogIndexes {
        let catalog = Catalog::from_items(vec![
            item("sofa", "sofa seating", [1.0, 0.0]),
            item("sofa2", "sofa seating", [0.98, 0.2]),
            item("chair", "chair seating", [0.9, 0.4]),
            item("table", "table", [0.0, 1.0]),
            item("table2", "table", [0.2, 0.98]),
            item("desk", "table desk", [0.4, 0.9]),
            item("lamp", "lamp", [-1.0, 0.0]),
            item("lamp2", "lamp", [-0.98, 0.2]),
        ])
        .unwrap();
        CatalogIndexes::build(catalog).unwrap()
    }

    fn ids(scene: &ProposedScene) -> Vec<&str> {
        scene.items.iter().map(|s| s.item_id.as_str()).collect()
    }

    #[test]
    fn test_goes_with_it_shape_and_order() {
        let indexes = indexes();
        let config = EngineConfig::default();
        let sampler = SceneSampler::new(&indexes, &config);
        let mut rng = StdRng::seed_from_u64(7);

        let scenes = sampler
            .goes_with_it::<_, &str>("sofa", &[], &[], &["table", "lamp"], &mut rng)
            .unwrap();

        assert!(!scenes.is_empty());
        assert!(scenes.len() <= config.scene_sample_size);
        for scene in &scenes {
            let members = ids(scene);
            assert_eq!(members.len(), 3);
            assert_eq!(*members.last().unwrap(), "sofa");
        }
        assert!(scenes.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_target_removed_and_unknowns_skipped() {
        let indexes = indexes();
        let config = EngineConfig::default();
        let sampler = SceneSampler::new(&indexes, &config);
        let mut rng = StdRng::seed_from_u64(1);

        let scenes = sampler
            .goes_with_it::<_, &str>("sofa", &[], &[], &["sofa", "ghost", "table"], &mut rng)
            .unwrap();
        assert!(scenes.iter().all(|s| s.items.len() == 2));
    }

    #[test]
    fn test_empty_scene_and_unknown_target() {
        let indexes = indexes();
        let config = EngineConfig::default();
        let sampler = SceneSampler::new(&indexes, &config);
        let mut rng = StdRng::seed_from_u64(1);

        let none = sampler
            .goes_with_it::<_, &str>("sofa", &[], &[], &[], &mut rng)
            .unwrap();
        assert!(none.is_empty());

        let missing = sampler.goes_with_it::<_, &str>("ghost", &[], &[], &["table"], &mut rng);
        assert!(matches!(missing, Err(Error::ItemNotFound(_))));
    }

    #[test]
    fn test_sample_is_reproducible_with_seed() {
        let indexes = indexes();
        let config = EngineConfig {
            scene_sample_size: 2,
            ..Default::default()
        };
        let sampler = SceneSampler::new(&indexes, &config);

        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            sampler
                .goes_with_it::<_, &str>("sofa", &[], &[], &["table", "lamp"], &mut rng)
                .unwrap()
        };
        let first = run(42);
        assert_eq!(first.len(), 2);
        assert_eq!(first, run(42));
    }

    #[test]
    fn test_preferences_do_not_change_candidate_pool() {
        let catalog = Catalog::from_items(vec![
            Item::new("s", "stool", Vector::new(vec![0.0, 0.0, 1.0])),
            Item::new("a", "armchair", Vector::new(vec![0.8, 0.0, 0.6])),
            Item::new("d", "divan", Vector::new(vec![0.7, 0.5, 0.5])),
            Item::new("l", "lamp", Vector::new(vec![0.0, 1.0, 0.0])),
            Item::new("t", "table", Vector::new(vec![1.0, 0.0, 0.0])),
        ])
        .unwrap();
        let indexes = CatalogIndexes::build(catalog).unwrap();
        let config = EngineConfig {
            scene_neighbors: 2,
            scene_candidates: 1,
            scene_sample_size: 1,
            ..Default::default()
        };
        let sampler = SceneSampler::new(&indexes, &config);
        let mut rng = StdRng::seed_from_u64(5);

        let plain = sampler
            .goes_with_it::<_, &str>("t", &[], &[], &["s"], &mut rng)
            .unwrap();
        assert_eq!(ids(&plain[0]), vec!["a", "t"]);

        // liking "l" favours "d" but must not pull it past "a" into the pool
        let liked = sampler
            .goes_with_it("t", &["l"], &[], &["s"], &mut rng)
            .unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(ids(&liked[0]), vec!["a", "t"]);
        assert!((liked[0].score - plain[0].score).abs() < 1e-5);
    }

    #[test]
    fn test_disliked_reorders_sample() {
        let indexes = indexes();
        let config = EngineConfig::default();
        let sampler = SceneSampler::new(&indexes, &config);

        let plain = sampler
            .goes_with_it::<_, &str>("sofa", &[], &[], &["table"], &mut StdRng::seed_from_u64(9))
            .unwrap();
        let adjusted = sampler
            .goes_with_it("sofa", &[], &["table"], &["table"], &mut StdRng::seed_from_u64(9))
            .unwrap();

        // same sample, every score pulled down by the disliked centroid
        assert_eq!(plain.len(), adjusted.len());
        let mut before: Vec<Vec<&str>> = plain.iter().map(ids).collect();
        let mut after: Vec<Vec<&str>> = adjusted.iter().map(ids).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
        assert!(adjusted.windows(2).all(|w| w[0].score >= w[1].score));
        for scene in &adjusted {
            let base = plain.iter().find(|p| ids(p) == ids(scene)).unwrap();
            assert!(scene.score < base.score);
        }
    }

    #[test]
    fn test_scene_cap() {
        let indexes = indexes();
        let config = EngineConfig {
            max_candidate_scenes: 2,
            ..Default::default()
        };
        let sampler = SceneSampler::new(&indexes, &config);
        let mut rng = StdRng::seed_from_u64(3);
        let result = sampler.goes_with_it::<_, &str>("sofa", &[], &[], &["table", "lamp"], &mut rng);
        assert!(matches!(result, Err(Error::SceneTooLarge { limit: 2, .. })));
    }

    #[test]
    fn test_similar_with_scene_uses_keyword_pool() {
        let indexes = indexes();
        let config = EngineConfig::default();
        let sampler = SceneSampler::new(&indexes, &config);

        let results = sampler
            .similar_with_scene::<&str>("chair", &[], &[], &["table"])
            .unwrap();
        // pool is everything tagged chair or seating
        let found: Vec<&str> = results.items().map(|s| s.item_id.as_str()).collect();
        assert!(!found.is_empty());
        assert!(found.iter().all(|id| ["sofa", "sofa2", "chair"].contains(id)));
        assert_eq!(results.kind(), ScoreKind::PreferenceAdjusted);
    }

    #[test]
    fn test_similar_with_scene_empty_cases() {
        let indexes = indexes();
        let config = EngineConfig::default();
        let sampler = SceneSampler::new(&indexes, &config);

        assert!(sampler
            .similar_with_scene::<&str>("chair", &[], &[], &[])
            .unwrap()
            .is_empty());

        let bare = Catalog::from_items(vec![Item::new("x", "bare", Vector::new(vec![1.0]))]).unwrap();
        let bare = CatalogIndexes::build(bare).unwrap();
        let sampler = SceneSampler::new(&bare, &config);
        assert!(sampler
            .similar_with_scene::<&str>("x", &[], &[], &["x"])
            .unwrap()
            .is_empty());
    }
}
