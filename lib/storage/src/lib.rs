//! # furnix Storage
//!
//! Catalog ingestion and index persistence:
//!
//! - [`catalog_source`] - list- or map-shaped catalog JSON, image mappings
//! - [`persistence`] - atomic save / validated load of every index file
//! - [`IndexManager`] - the current index generation and its atomic swap

pub mod catalog_source;
pub mod manager;
pub mod persistence;

pub use catalog_source::load_catalog;
pub use manager::IndexManager;
pub use persistence::{load_indexes, save_indexes, IndexPaths};
