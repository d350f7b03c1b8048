//! # furnix Retrieval
//!
//! Query paths over a built [`furnix_core::CatalogIndexes`]:
//!
//! - [`HybridRetriever`] - boolean filter, then vector ranking of the matches
//! - [`PreferenceReranker`] - liked / disliked centroid adjustment
//! - [`SceneSampler`] - compatible scene proposals for a target item
//! - [`Engine`] - the public surface, wiring in the external models

pub mod collaborator;
pub mod config;
pub mod engine;
pub mod hybrid;
pub mod rerank;
pub mod scene;

pub use collaborator::{Embedder, QueryObject, QueryPipeline, QueryUnderstanding, Understanding};
pub use config::EngineConfig;
pub use engine::Engine;
pub use hybrid::HybridRetriever;
pub use rerank::{HasItemId, PreferenceReranker, Preferences};
pub use scene::{ProposedScene, SceneSampler};
