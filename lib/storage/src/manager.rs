use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use furnix_core::{Catalog, CatalogIndexes, Result};

use crate::catalog_source::load_catalog;
use crate::persistence::{load_indexes, save_indexes, IndexPaths};

/// Owns the current index generation and its on-disk home.
///
/// Readers take a [`IndexManager::snapshot`] and keep using it for the whole
/// request; a rebuild prepares the next generation off to the side, persists
/// it and only then swaps it in. Rebuilds and saves run one at a time so the
/// directory never mixes files from two generations.
pub struct IndexManager {
    paths: IndexPaths,
    current: RwLock<Arc<CatalogIndexes>>,
    writer: Mutex<()>,
}

impl IndexManager {
    /// Load a previously built index directory. Missing or inconsistent
    /// files are an error; nothing is served from a partial index.
    pub fn open(paths: IndexPaths) -> Result<Self> {
        let indexes = load_indexes(&paths)?;
        info!(
            dir = %paths.dir.display(),
            items = indexes.catalog.len(),
            "index opened"
        );
        Ok(Self::with_indexes(paths, indexes))
    }

    /// Build from a catalog file and persist the result.
    pub fn build_from_catalog<P: AsRef<Path>>(
        paths: IndexPaths,
        catalog_file: P,
        image_mapping: Option<&Path>,
    ) -> Result<Self> {
        let catalog = load_catalog(catalog_file, image_mapping)?;
        let indexes = CatalogIndexes::build(catalog)?;
        save_indexes(&indexes, &paths)?;
        Ok(Self::with_indexes(paths, indexes))
    }

    /// Wrap already-built indexes without touching disk.
    pub fn with_indexes(paths: IndexPaths, indexes: CatalogIndexes) -> Self {
        Self {
            paths,
            current: RwLock::new(Arc::new(indexes)),
            writer: Mutex::new(()),
        }
    }

    #[inline]
    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    /// The current generation. Cheap; holds no lock once returned.
    pub fn snapshot(&self) -> Arc<CatalogIndexes> {
        Arc::clone(&self.current.read())
    }

    /// Build a new generation from `catalog`, save it, then swap it in.
    /// On error the current generation stays in place.
    pub fn rebuild(&self, catalog: Catalog) -> Result<Arc<CatalogIndexes>> {
        let _writer = self.writer.lock();
        let next = Arc::new(CatalogIndexes::build(catalog)?);
        save_indexes(&next, &self.paths)?;
        *self.current.write() = Arc::clone(&next);
        info!(items = next.catalog.len(), "index swapped");
        Ok(next)
    }

    /// Reload the catalog file and rebuild from it.
    pub fn rebuild_from_file<P: AsRef<Path>>(
        &self,
        catalog_file: P,
        image_mapping: Option<&Path>,
    ) -> Result<Arc<CatalogIndexes>> {
        self.rebuild(load_catalog(catalog_file, image_mapping)?)
    }

    /// Persist the current generation.
    pub fn save(&self) -> Result<()> {
        let _writer = self.writer.lock();
        save_indexes(&self.snapshot(), &self.paths)
    }
}
