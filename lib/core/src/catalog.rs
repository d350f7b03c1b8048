use ahash::AHashMap;
use std::sync::Arc;

use crate::item::{Item, ItemId, ItemSummary};
use crate::{Error, Result, Vector};

/// Read-only item store, keyed by id and kept in ingestion order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Arc<Item>>,
    positions: AHashMap<ItemId, usize>,
    dim: usize,
}

impl Catalog {
    /// Build a catalog. Ids must be unique and every embedding must share one
    /// dimensionality.
    pub fn from_items<I>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = Item>,
    {
        let mut catalog = Catalog::default();
        for item in items {
            if catalog.positions.contains_key(&item.id) {
                return Err(Error::DuplicateItem(item.id.to_string()));
            }
            if catalog.items.is_empty() {
                catalog.dim = item.embedding.dim();
            } else if item.embedding.dim() != catalog.dim {
                return Err(Error::InvalidDimension {
                    expected: catalog.dim,
                    actual: item.embedding.dim(),
                });
            }
            catalog.positions.insert(item.id.clone(), catalog.items.len());
            catalog.items.push(Arc::new(item));
        }
        Ok(catalog)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Embedding dimensionality shared by all items (0 when empty).
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Arc<Item>> {
        self.positions.get(id).map(|&pos| &self.items[pos])
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Like [`Catalog::get`] but unknown ids are an error.
    pub fn require(&self, id: &str) -> Result<&Arc<Item>> {
        self.get(id).ok_or_else(|| Error::ItemNotFound(id.to_string()))
    }

    pub fn summary(&self, id: &str) -> Result<ItemSummary> {
        self.require(id).map(|item| item.summary())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Item>> {
        self.items.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter().map(|item| &item.id)
    }

    /// Mean embedding of the known ids; unknown ids are skipped.
    /// `None` when no id resolves.
    pub fn centroid<S: AsRef<str>>(&self, ids: &[S]) -> Option<Vector> {
        Vector::mean(
            ids.iter()
                .filter_map(|id| self.get(id.as_ref()))
                .map(|item| item.embedding.as_slice()),
        )
    }
}
