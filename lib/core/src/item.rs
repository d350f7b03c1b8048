use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::{Error, Result, Vector};

/// Unique catalog identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

/// A catalog attribute that may be stored either as one string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// Normalize to a list, dropping empty strings.
    pub fn into_vec(self) -> Vec<String> {
        let values = match self {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        };
        values.into_iter().filter(|s| !s.is_empty()).collect()
    }
}

fn normalize(value: Option<StringOrList>) -> Vec<String> {
    value.map(StringOrList::into_vec).unwrap_or_default()
}

/// Categorical attributes, already normalized to lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub material: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub style: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub color: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shape: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fabric_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finish_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pattern: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<String>,
}

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub description: String,
    /// Space-separated keyword tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
    pub embedding: Vector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_embedding: Option<Vector>,
    /// External image identifier, if the item has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, description: impl Into<String>, embedding: Vector) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            keywords: None,
            attributes: Attributes::default(),
            embedding,
            image_embedding: None,
            image_ref: None,
        }
    }

    #[must_use]
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    #[must_use]
    pub fn with_image_embedding(mut self, embedding: Vector) -> Self {
        self.image_embedding = Some(embedding);
        self
    }

    /// Keyword tags split on whitespace.
    pub fn keyword_list(&self) -> impl Iterator<Item = &str> {
        self.keywords.as_deref().unwrap_or("").split_whitespace()
    }

    /// All values stored for an indexable field.
    pub fn field_values(&self, field: IndexField) -> Vec<&str> {
        let attrs = &self.attributes;
        let list: &[String] = match field {
            IndexField::Description => return vec![self.description.as_str()],
            IndexField::Keywords => return self.keywords.as_deref().into_iter().collect(),
            IndexField::Material => &attrs.material,
            IndexField::Style => &attrs.style,
            IndexField::Color => &attrs.color,
            IndexField::Shape => &attrs.shape,
            IndexField::FabricType => &attrs.fabric_type,
            IndexField::FinishType => &attrs.finish_type,
            IndexField::Pattern => &attrs.pattern,
            IndexField::Dimensions => &attrs.dimensions,
        };
        list.iter().map(String::as_str).collect()
    }

    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            item_id: self.id.clone(),
            description: self.description.clone(),
            image_id: self.image_ref.clone(),
        }
    }
}

/// Fields scanned when building the term index. Identifiers, embeddings and
/// image references are never indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexField {
    Description,
    Keywords,
    Shape,
    Material,
    Style,
    Color,
    FabricType,
    FinishType,
    Pattern,
    Dimensions,
}

impl IndexField {
    pub const ALL: [IndexField; 10] = [
        IndexField::Description,
        IndexField::Keywords,
        IndexField::Shape,
        IndexField::Material,
        IndexField::Style,
        IndexField::Color,
        IndexField::FabricType,
        IndexField::FinishType,
        IndexField::Pattern,
        IndexField::Dimensions,
    ];
}

/// What a caller gets back for a matched item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub item_id: ItemId,
    pub description: String,
    pub image_id: Option<String>,
}

/// Raw catalog record as it appears in the source JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRecord {
    pub item_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "keywords")]
    pub item_keywords: Option<String>,
    #[serde(default, alias = "shape")]
    pub item_shape: Option<StringOrList>,
    #[serde(default)]
    pub material: Option<StringOrList>,
    #[serde(default)]
    pub style: Option<StringOrList>,
    #[serde(default)]
    pub color: Option<StringOrList>,
    #[serde(default)]
    pub fabric_type: Option<StringOrList>,
    #[serde(default)]
    pub finish_type: Option<StringOrList>,
    #[serde(default)]
    pub pattern: Option<StringOrList>,
    #[serde(default)]
    pub dimensions: Option<StringOrList>,
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub image_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub image_id: Option<String>,
}

impl CatalogRecord {
    /// Convert into an [`Item`], using `fallback_id` when the record does
    /// not carry its own identifier (map-shaped catalogs).
    pub fn into_item(self, fallback_id: Option<&str>) -> Result<Item> {
        let id = self
            .item_id
            .or_else(|| fallback_id.map(str::to_string))
            .ok_or_else(|| Error::Serialization("catalog record without item_id".to_string()))?;

        if self.embedding.is_empty() {
            return Err(Error::InvalidDimension {
                expected: 1,
                actual: 0,
            });
        }

        let attributes = Attributes {
            material: normalize(self.material),
            style: normalize(self.style),
            color: normalize(self.color),
            shape: normalize(self.item_shape),
            fabric_type: normalize(self.fabric_type),
            finish_type: normalize(self.finish_type),
            pattern: normalize(self.pattern),
            dimensions: normalize(self.dimensions),
        };

        Ok(Item {
            id: ItemId::new(id),
            description: self.description,
            keywords: self.item_keywords.filter(|k| !k.trim().is_empty()),
            attributes,
            embedding: Vector::new(self.embedding),
            image_embedding: self.image_embedding.filter(|e| !e.is_empty()).map(Vector::new),
            image_ref: self.image_id,
        })
    }
}
