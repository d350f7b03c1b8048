//! Reading the raw catalog and the optional image reference mapping.

use serde_json::Value;
use ahash::AHashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use furnix_core::{Catalog, CatalogRecord, Error, Item, Result};

/// Parse catalog JSON. Accepts either a list of records carrying their own
/// `item_id`, or an object keyed by item id. List records without an id are
/// skipped with a warning.
pub fn parse_catalog(json: &str) -> Result<Vec<Item>> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Array(records) => {
            let mut items = Vec::with_capacity(records.len());
            for (position, raw) in records.into_iter().enumerate() {
                let record: CatalogRecord = serde_json::from_value(raw)?;
                if record.item_id.is_none() {
                    warn!(position, "catalog record without item_id, skipping");
                    continue;
                }
                items.push(record.into_item(None)?);
            }
            Ok(items)
        }
        Value::Object(records) => records
            .into_iter()
            .map(|(id, raw)| {
                let record: CatalogRecord = serde_json::from_value(raw)?;
                record.into_item(Some(&id))
            })
            .collect(),
        _ => Err(Error::Serialization(
            "catalog must be a list or an object of records".to_string(),
        )),
    }
}

/// Load `item_id -> image_id` pairs.
pub fn load_image_mapping<P: AsRef<Path>>(path: P) -> Result<AHashMap<String, String>> {
    let text = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&text)?)
}

/// Fill in image references from `mapping`. Returns how many items changed.
pub fn apply_image_mapping(items: &mut [Item], mapping: &AHashMap<String, String>) -> usize {
    let mut applied = 0;
    for item in items.iter_mut() {
        if let Some(image_id) = mapping.get(item.id.as_str()) {
            item.image_ref = Some(image_id.clone());
            applied += 1;
        }
    }
    applied
}

/// Read a catalog file and, when given, merge an image mapping file into it.
pub fn load_catalog<P: AsRef<Path>>(path: P, image_mapping: Option<&Path>) -> Result<Catalog> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let mut items = parse_catalog(&text)?;

    if let Some(mapping_path) = image_mapping {
        let mapping = load_image_mapping(mapping_path)?;
        let applied = apply_image_mapping(&mut items, &mapping);
        info!(applied, "image references merged");
    }

    info!(items = items.len(), path = %path.display(), "catalog loaded");
    Catalog::from_items(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_list_catalog_skips_missing_ids() {
        let json = r#"[
            {"item_id": "a", "description": "oak chair", "embedding": [1.0, 0.0]},
            {"description": "no id", "embedding": [0.0, 1.0]},
            {"item_id": "b", "description": "steel desk", "material": "Steel", "embedding": [0.0, 1.0]}
        ]"#;
        let items = parse_catalog(json).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(items[1].attributes.material, vec!["Steel"]);
    }

    #[test]
    fn test_map_catalog_uses_keys() {
        let json = r#"{"x1": {"description": "lamp", "embedding": [1.0]}}"#;
        let items = parse_catalog(json).unwrap();
        assert_eq!(items[0].id.as_str(), "x1");
    }

    #[test]
    fn test_scalar_catalog_rejected() {
        assert!(matches!(parse_catalog("42"), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_load_with_image_mapping() {
        let mut catalog = NamedTempFile::new().unwrap();
        write!(
            catalog,
            r#"[{{"item_id": "a", "description": "oak chair", "embedding": [1.0]}},
                {{"item_id": "b", "description": "desk", "embedding": [0.5]}}]"#
        )
        .unwrap();
        let mut mapping = NamedTempFile::new().unwrap();
        write!(mapping, r#"{{"a": "img-a", "zz": "img-z"}}"#).unwrap();

        let catalog = load_catalog(catalog.path(), Some(mapping.path())).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("a").unwrap().image_ref.as_deref(), Some("img-a"));
        assert!(catalog.get("b").unwrap().image_ref.is_none());
    }
}
