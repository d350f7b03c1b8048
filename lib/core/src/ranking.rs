//! Ranked result lists that carry their own score semantics.
//!
//! Every list knows which metric produced its scores and therefore which
//! direction is "better". Consumers check [`Ranked::order`] instead of
//! assuming a convention.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreOrder {
    /// Smaller is better.
    Ascending,
    /// Larger is better.
    Descending,
}

impl ScoreOrder {
    /// Comparator placing the better score first.
    #[inline]
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            ScoreOrder::Ascending => ord,
            ScoreOrder::Descending => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    EuclideanDistance,
    CosineSimilarity,
    /// Similarity shifted by liked/disliked centroid boosts.
    PreferenceAdjusted,
}

impl ScoreKind {
    #[inline]
    pub fn order(self) -> ScoreOrder {
        match self {
            ScoreKind::EuclideanDistance => ScoreOrder::Ascending,
            ScoreKind::CosineSimilarity | ScoreKind::PreferenceAdjusted => ScoreOrder::Descending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored<T> {
    pub item: T,
    pub score: f32,
}

impl<T> Scored<T> {
    #[inline]
    pub fn new(item: T, score: f32) -> Self {
        Self { item, score }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranked<T> {
    kind: ScoreKind,
    entries: Vec<Scored<T>>,
}

impl<T> Ranked<T> {
    /// Build a ranking, sorting entries by the kind's order. The sort is
    /// stable, so ties keep their input order.
    pub fn new(kind: ScoreKind, mut entries: Vec<Scored<T>>) -> Self {
        let order = kind.order();
        entries.sort_by(|a, b| order.compare(a.score, b.score));
        Self { kind, entries }
    }

    pub fn empty(kind: ScoreKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> ScoreKind {
        self.kind
    }

    #[inline]
    pub fn order(&self) -> ScoreOrder {
        self.kind.order()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<&Scored<T>> {
        self.entries.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scored<T>> {
        self.entries.iter()
    }

    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Keep entries matching `keep`, preserving order.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Scored<T>) -> bool,
    {
        self.entries.retain(keep);
    }

    /// Transform the payload while keeping scores and order.
    pub fn map<U, F>(self, mut f: F) -> Ranked<U>
    where
        F: FnMut(T) -> U,
    {
        Ranked {
            kind: self.kind,
            entries: self
                .entries
                .into_iter()
                .map(|s| Scored::new(f(s.item), s.score))
                .collect(),
        }
    }

    /// Fallible variant of [`Ranked::map`].
    pub fn try_map<U, E, F>(self, mut f: F) -> Result<Ranked<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        let entries = self
            .entries
            .into_iter()
            .map(|s| Ok(Scored::new(f(s.item)?, s.score)))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Ranked {
            kind: self.kind,
            entries,
        })
    }

    pub fn into_entries(self) -> Vec<Scored<T>> {
        self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|s| &s.item)
    }
}

impl<T> IntoIterator for Ranked<T> {
    type Item = Scored<T>;
    type IntoIter = std::vec::IntoIter<Scored<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Ranked<T> {
    type Item = &'a Scored<T>;
    type IntoIter = std::slice::Iter<'a, Scored<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
