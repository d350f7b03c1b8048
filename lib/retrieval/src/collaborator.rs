//! Interfaces to the external models the engine depends on.
//!
//! Query understanding (free text to boolean query plus ranking text) and
//! embedding generation live outside this crate. Implementations report
//! quota exhaustion as [`Error::RateLimited`] and everything else as
//! [`Error::Collaborator`]; the engine passes both through untouched.

use serde::{Deserialize, Serialize};

use furnix_core::{Error, Item, Result, Vector};

const BOOLEAN_MARKER: &str = "Boolean Query:";
const DESCRIPTION_MARKER: &str = "Object Description:";
// Unlabelled lines longer than this are taken as the description.
const MIN_DESCRIPTION_LEN: usize = 50;

/// What the user asked for, with hints taken from the item they selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryObject {
    pub user_query: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub keywords: String,
}

impl QueryObject {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            ..Default::default()
        }
    }

    /// Build a query object whose hints come from `item`'s attributes.
    pub fn for_item(user_query: impl Into<String>, item: &Item) -> Self {
        Self {
            user_query: user_query.into(),
            material: item.attributes.material.join(", "),
            style: item.attributes.style.join(", "),
            keywords: item.keywords.clone().unwrap_or_default(),
        }
    }
}

/// The two strings query understanding hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Understanding {
    pub boolean_query: String,
    pub ranking_description: String,
}

impl Understanding {
    pub fn new(boolean_query: impl Into<String>, ranking_description: impl Into<String>) -> Self {
        Self {
            boolean_query: boolean_query.into(),
            ranking_description: ranking_description.into(),
        }
    }

    /// Parse a language-model reply of the form
    ///
    /// ```text
    /// Boolean Query: sofa AND (velvet OR linen)
    /// Object Description: A deep three-seat sofa ...
    /// ```
    ///
    /// Labelled lines win. Failing that, the first line containing an
    /// operator becomes the query and the first long line the description.
    /// As a last resort the reply is split on the two labels even when they
    /// share a line.
    pub fn parse_response(text: &str) -> Result<Self> {
        let mut boolean_query = String::new();
        let mut description = String::new();

        for line in text.lines() {
            if let Some((_, rest)) = line.split_once(BOOLEAN_MARKER) {
                boolean_query = rest.trim().to_string();
            } else if let Some((_, rest)) = line.split_once(DESCRIPTION_MARKER) {
                description = rest.trim().to_string();
            } else if boolean_query.is_empty() && has_operator(line) {
                boolean_query = line.trim().to_string();
            } else if description.is_empty() && line.len() > MIN_DESCRIPTION_LEN {
                description = line.trim().to_string();
            }
        }

        if boolean_query.is_empty() || description.is_empty() {
            return Self::split_on_markers(text);
        }
        Ok(Self::new(boolean_query, description))
    }

    fn split_on_markers(text: &str) -> Result<Self> {
        let malformed = || Error::Collaborator(format!("unparseable query understanding reply: {:?}", text));
        let (_, after_query) = text.split_once(BOOLEAN_MARKER).ok_or_else(malformed)?;
        let (query, description) = after_query.split_once(DESCRIPTION_MARKER).ok_or_else(malformed)?;
        Ok(Self::new(query.trim(), description.trim()))
    }
}

fn has_operator(line: &str) -> bool {
    line.split_whitespace()
        .any(|w| matches!(w, "AND" | "OR" | "NOT"))
}

/// Turns a structured query into a boolean filter and a ranking text.
pub trait QueryUnderstanding: Send + Sync {
    fn understand(&self, query: &QueryObject) -> Result<Understanding>;
}

/// Turns text into an embedding of fixed dimension.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    fn embed_text(&self, text: &str) -> Result<Vector>;
}

/// A query understanding model paired with the embedder for one vector space.
pub struct QueryPipeline {
    understanding: Box<dyn QueryUnderstanding>,
    embedder: Box<dyn Embedder>,
}

impl QueryPipeline {
    pub fn new(understanding: Box<dyn QueryUnderstanding>, embedder: Box<dyn Embedder>) -> Self {
        Self {
            understanding,
            embedder,
        }
    }

    pub fn understand(&self, query: &QueryObject) -> Result<Understanding> {
        self.understanding.understand(query)
    }

    /// Embed `text`, checking the result against `expected_dim`.
    pub fn embed(&self, text: &str, expected_dim: usize) -> Result<Vector> {
        let vector = self.embedder.embed_text(text)?;
        if vector.dim() != expected_dim {
            return Err(Error::InvalidDimension {
                expected: expected_dim,
                actual: vector.dim(),
            });
        }
        Ok(vector)
    }

    pub fn embedder_dim(&self) -> usize {
        self.embedder.dim()
    }
}

impl std::fmt::Debug for QueryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPipeline")
            .field("embedder_dim", &self.embedder.dim())
            .finish_non_exhaustive()
    }
}
