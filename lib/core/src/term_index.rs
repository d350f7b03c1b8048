// Inverted index from lowercase word tokens to item ids.
use ahash::{AHashMap, AHashSet};

use crate::catalog::Catalog;
use crate::item::{IndexField, ItemId};
use crate::{Error, Result};

pub type IdSet = AHashSet<ItemId>;

#[derive(Debug, Clone, Default)]
pub struct TermIndex {
    postings: AHashMap<String, IdSet>,
    // every catalog id; the domain for unary NOT
    universe: IdSet,
    empty: IdSet,
}

impl TermIndex {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Split text into lowercase `\w+` runs (alphanumerics and underscore).
    pub fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    /// Scan every indexable field of every item.
    pub fn build(catalog: &Catalog) -> Self {
        let mut index = Self::new();
        for item in catalog.iter() {
            index.universe.insert(item.id.clone());
            for field in IndexField::ALL {
                for value in item.field_values(field) {
                    for token in Self::tokenize(value) {
                        index
                            .postings
                            .entry(token)
                            .or_default()
                            .insert(item.id.clone());
                    }
                }
            }
        }
        index
    }

    /// Rebuild from persisted postings. Every posted id must exist in `catalog`.
    pub fn from_postings<I>(postings: I, catalog: &Catalog) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<ItemId>)>,
    {
        let mut index = Self::new();
        index.universe = catalog.ids().cloned().collect();
        for (token, ids) in postings {
            let set: IdSet = ids.into_iter().collect();
            index.postings.insert(token.to_lowercase(), set);
        }
        index.validate_against(catalog)?;
        Ok(index)
    }

    /// Ids registered under `token`, or the empty set. Case-insensitive.
    #[inline]
    pub fn lookup(&self, token: &str) -> &IdSet {
        let found = match self.postings.get(token) {
            Some(set) => Some(set),
            None => self.postings.get(token.to_lowercase().as_str()),
        };
        found.unwrap_or(&self.empty)
    }

    #[inline]
    pub fn universe(&self) -> &IdSet {
        &self.universe
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn postings(&self) -> impl Iterator<Item = (&str, &IdSet)> {
        self.postings.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Referential integrity: every posted id exists in the catalog.
    pub fn validate_against(&self, catalog: &Catalog) -> Result<()> {
        for (token, ids) in &self.postings {
            if let Some(missing) = ids.iter().find(|id| !catalog.contains(id.as_str())) {
                return Err(Error::Persistence(format!(
                    "token '{}' references unknown item {}",
                    token, missing
                )));
            }
        }
        Ok(())
    }
}
