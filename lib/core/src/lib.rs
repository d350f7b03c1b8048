//! # furnix Core
//!
//! Core data structures for the furnix catalog retrieval engine:
//!
//! - [`Item`] / [`Catalog`] - immutable catalog records and the item store
//! - [`TermIndex`] - inverted index from word tokens to item ids
//! - [`query`] - boolean `AND` / `OR` / `NOT` evaluation over the term index
//! - [`VectorIndex`] - exact nearest-neighbour search over embeddings
//! - [`Ranked`] - result lists that carry their score direction
//!
//! ## Example
//!
//! ```rust
//! use furnix_core::{Catalog, CatalogIndexes, Item, Vector, query};
//!
//! let catalog = Catalog::from_items(vec![
//!     Item::new("id1", "wood chair", Vector::new(vec![1.0, 0.0])),
//!     Item::new("id2", "metal chair", Vector::new(vec![0.0, 1.0])),
//! ]).unwrap();
//! let indexes = CatalogIndexes::build(catalog).unwrap();
//!
//! let matches = query::evaluate("chair AND NOT metal", &indexes.terms);
//! assert!(matches.contains("id1"));
//!
//! let nearest = indexes.vectors.search(&Vector::new(vec![1.0, 0.0]), 1).unwrap();
//! assert_eq!(nearest.first().unwrap().item.as_str(), "id1");
//! ```

pub mod catalog;
pub mod error;
pub mod indexes;
pub mod item;
pub mod query;
pub mod ranking;
pub mod term_index;
pub mod vector;
pub mod vector_index;

/// Distance kernels
///
/// - AVX2/FMA on x86_64
/// - NEON on ARM64
/// - scalar fallback elsewhere
pub mod simd;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use indexes::CatalogIndexes;
pub use item::{Attributes, CatalogRecord, IndexField, Item, ItemId, ItemSummary, StringOrList};
pub use query::Expr;
pub use ranking::{Ranked, ScoreKind, ScoreOrder, Scored};
pub use term_index::{IdSet, TermIndex};
pub use vector::Vector;
pub use vector_index::VectorIndex;
