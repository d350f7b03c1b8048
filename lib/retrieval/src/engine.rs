use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

use furnix_core::{
    query, CatalogIndexes, Error, IdSet, ItemSummary, Ranked, Result, Vector,
};

use crate::collaborator::{QueryObject, QueryPipeline};
use crate::config::EngineConfig;
use crate::hybrid::HybridRetriever;
use crate::rerank::PreferenceReranker;
use crate::scene::{ProposedScene, SceneSampler};

/// Public query surface over one immutable set of indexes.
///
/// An engine is cheap to construct per request from an
/// `Arc<CatalogIndexes>` snapshot; collaborators are optional so the pure
/// paths (boolean, similar items, scenes) work without any models.
#[derive(Debug)]
pub struct Engine {
    indexes: Arc<CatalogIndexes>,
    config: EngineConfig,
    pipeline: Option<Arc<QueryPipeline>>,
    image_pipeline: Option<Arc<QueryPipeline>>,
}

impl Engine {
    pub fn new(indexes: Arc<CatalogIndexes>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            indexes,
            config,
            pipeline: None,
            image_pipeline: None,
        })
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Arc<QueryPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    #[must_use]
    pub fn with_image_pipeline(mut self, pipeline: Arc<QueryPipeline>) -> Self {
        self.image_pipeline = Some(pipeline);
        self
    }

    #[inline]
    pub fn indexes(&self) -> &Arc<CatalogIndexes> {
        &self.indexes
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn reranker(&self) -> PreferenceReranker {
        PreferenceReranker::new(self.config.liked_weight, self.config.disliked_weight)
    }

    pub fn evaluate_boolean(&self, boolean_query: &str) -> IdSet {
        query::evaluate(boolean_query, &self.indexes.terms)
    }

    /// Hybrid retrieval with caller-supplied inputs, ascending distance.
    pub fn retrieve(
        &self,
        boolean_query: &str,
        ranking_vector: &Vector,
        k: usize,
    ) -> Result<Ranked<ItemSummary>> {
        HybridRetriever::new(&self.indexes).retrieve(boolean_query, ranking_vector, k)
    }

    /// Understand the query, embed its ranking description and run hybrid
    /// retrieval. Collaborator failures propagate unchanged.
    pub fn retrieve_with_query_object(
        &self,
        query: &QueryObject,
        k: usize,
    ) -> Result<Ranked<ItemSummary>> {
        let pipeline = self
            .pipeline
            .as_deref()
            .ok_or_else(|| Error::Collaborator("no query pipeline configured".into()))?;

        let understanding = pipeline.understand(query)?;
        debug!(
            boolean = %understanding.boolean_query,
            "query understood"
        );
        let vector = pipeline.embed(&understanding.ranking_description, self.indexes.vectors.dim())?;
        self.retrieve(&understanding.boolean_query, &vector, k)
    }

    /// As [`Engine::retrieve_with_query_object`] but ranked in the image
    /// embedding space.
    pub fn retrieve_images_with_query_object(
        &self,
        query: &QueryObject,
        k: usize,
    ) -> Result<Ranked<ItemSummary>> {
        let pipeline = self
            .image_pipeline
            .as_deref()
            .ok_or_else(|| Error::Collaborator("no image query pipeline configured".into()))?;
        let images = self
            .indexes
            .image_vectors
            .as_ref()
            .ok_or_else(|| Error::Persistence("catalog has no image embeddings".into()))?;

        let understanding = pipeline.understand(query)?;
        let vector = pipeline.embed(&understanding.ranking_description, images.dim())?;
        HybridRetriever::new(&self.indexes).retrieve_in(
            images,
            &understanding.boolean_query,
            &vector,
            k,
        )
    }

    /// Items most similar to `item_id` (excluding itself), adjusted by the
    /// user's preferences. Unknown `item_id` is an error.
    pub fn get_similar_items<S: AsRef<str>>(
        &self,
        item_id: &str,
        liked: &[S],
        disliked: &[S],
    ) -> Result<Ranked<ItemSummary>> {
        let item = self.indexes.catalog.require(item_id)?;
        let retriever = HybridRetriever::new(&self.indexes);
        let hits = retriever.similar(
            &item.embedding,
            self.config.similar_items_k,
            self.config.self_match_threshold,
        )?;
        let reranked = self
            .reranker()
            .rerank(hits, liked, disliked, &self.indexes.catalog)?;
        info!(item = item_id, results = reranked.len(), "similar items");
        retriever.summarize(reranked)
    }

    pub fn get_similar_items_with_scene<S: AsRef<str>>(
        &self,
        item_id: &str,
        liked: &[S],
        disliked: &[S],
        scene: &[S],
    ) -> Result<Ranked<ItemSummary>> {
        SceneSampler::new(&self.indexes, &self.config).similar_with_scene(item_id, liked, disliked, scene)
    }

    pub fn goes_with_it<S: AsRef<str>>(
        &self,
        item_id: &str,
        liked: &[S],
        disliked: &[S],
        scene: &[S],
    ) -> Result<Vec<ProposedScene>> {
        self.goes_with_it_with_rng(item_id, liked, disliked, scene, &mut rand::rng())
    }

    pub fn goes_with_it_with_rng<R, S>(
        &self,
        item_id: &str,
        liked: &[S],
        disliked: &[S],
        scene: &[S],
        rng: &mut R,
    ) -> Result<Vec<ProposedScene>>
    where
        R: Rng + ?Sized,
        S: AsRef<str>,
    {
        let scenes = SceneSampler::new(&self.indexes, &self.config)
            .goes_with_it(item_id, liked, disliked, scene, rng)?;
        info!(item = item_id, scenes = scenes.len(), "goes with it");
        Ok(scenes)
    }
}
