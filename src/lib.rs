//! # furnix
//!
//! A furniture catalog retrieval engine: boolean term filtering combined with
//! embedding similarity ranking, preference reranking and compatible-scene
//! generation.
//!
//! ## Quick Start
//!
//! ### Building an index
//!
//! ```bash
//! furnix build --data-file catalog.json --index-dir ./index
//! furnix --index-dir ./index boolean "sofa AND (velvet OR linen) NOT leather"
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use furnix::prelude::*;
//!
//! let catalog = Catalog::from_items(vec![
//!     Item::new("id1", "wood chair", Vector::new(vec![1.0, 0.0])),
//!     Item::new("id2", "metal chair", Vector::new(vec![0.0, 1.0])),
//!     Item::new("id3", "wood stool", Vector::new(vec![1.0, 0.01])),
//! ]).unwrap();
//! let indexes = CatalogIndexes::build(catalog).unwrap().into_shared();
//! let engine = Engine::new(indexes, EngineConfig::default()).unwrap();
//!
//! let results = engine.retrieve("wood", &Vector::new(vec![1.0, 0.0]), 2).unwrap();
//! let ids: Vec<&str> = results.items().map(|s| s.item_id.as_str()).collect();
//! assert_eq!(ids, vec!["id1", "id3"]);
//! ```
//!
//! ## Crate Structure
//!
//! - `furnix-core` - items, catalog, term index, boolean queries, vector index
//! - `furnix-retrieval` - hybrid retrieval, reranking, scenes, the [`Engine`]
//! - `furnix-storage` - catalog loading, index files, [`IndexManager`]

// Re-export core types
pub use furnix_core::{
    query, Catalog, CatalogIndexes, Error, IdSet, Item, ItemId, ItemSummary, Ranked, Result,
    ScoreKind, ScoreOrder, Scored, TermIndex, Vector, VectorIndex,
};

// Re-export retrieval
pub use furnix_retrieval::{
    Embedder, Engine, EngineConfig, HybridRetriever, PreferenceReranker, ProposedScene,
    QueryObject, QueryPipeline, QueryUnderstanding, SceneSampler, Understanding,
};

// Re-export storage
pub use furnix_storage::{IndexManager, IndexPaths};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Catalog, CatalogIndexes, Embedder, Engine, EngineConfig, Error, IndexManager, IndexPaths,
        Item, ItemId, ItemSummary, ProposedScene, QueryObject, QueryUnderstanding, Ranked, Result,
        ScoreKind, Vector,
    };
}

/// SIMD-optimized vector operations
pub mod simd {
    pub use furnix_core::simd::{dot_product_simd, l2_distance_simd, norm_simd};
}
