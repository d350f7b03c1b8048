use std::sync::Arc;

use crate::catalog::Catalog;
use crate::term_index::TermIndex;
use crate::vector_index::VectorIndex;
use crate::Result;

/// Everything a query needs, built once and read-only afterwards.
///
/// Shared between requests as `Arc<CatalogIndexes>`; a rebuild produces a new
/// value and swaps the `Arc` instead of mutating this one.
#[derive(Debug, Clone)]
pub struct CatalogIndexes {
    pub catalog: Catalog,
    pub terms: TermIndex,
    pub vectors: VectorIndex,
    pub image_vectors: Option<VectorIndex>,
}

impl CatalogIndexes {
    /// Scan the catalog and build every index.
    pub fn build(catalog: Catalog) -> Result<Self> {
        let terms = TermIndex::build(&catalog);
        let vectors = VectorIndex::from_catalog(&catalog)?;
        let image_vectors = VectorIndex::from_catalog_images(&catalog)?;
        Ok(Self {
            catalog,
            terms,
            vectors,
            image_vectors,
        })
    }

    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;
    use crate::Vector;

    #[test]
    fn test_build_all_indexes() {
        let catalog = Catalog::from_items(vec![
            Item::new("a", "oak chair", Vector::new(vec![1.0, 0.0]))
                .with_image_embedding(Vector::new(vec![0.5, 0.5, 0.0])),
            Item::new("b", "steel desk", Vector::new(vec![0.0, 1.0])),
        ])
        .unwrap();

        let indexes = CatalogIndexes::build(catalog).unwrap();
        assert_eq!(indexes.vectors.len(), 2);
        assert!(indexes.terms.lookup("oak").contains("a"));

        let images = indexes.image_vectors.as_ref().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images.dim(), 3);
    }

    #[test]
    fn test_no_image_embeddings_means_no_image_index() {
        let catalog =
            Catalog::from_items(vec![Item::new("a", "oak chair", Vector::new(vec![1.0]))]).unwrap();
        assert!(CatalogIndexes::build(catalog).unwrap().image_vectors.is_none());
    }
}
