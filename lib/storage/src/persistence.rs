//! On-disk layout of a built index directory.
//!
//! | file | contents |
//! |---|---|
//! | `terms.json` | token postings and full item records (JSON) |
//! | `embeddings.bin` | dense embedding matrix (bincode) |
//! | `item_ids.bin` | row order of the matrix (bincode) |
//! | `vectors.idx` | vector index header and row norms (bincode) |
//! | `image_*` | the same three files for the image space, when present |
//!
//! Every file is written atomically. Loading fails fast on a missing file
//! or any disagreement between the pieces.

use atomicwrites::{AtomicFile, OverwriteBehavior};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use furnix_core::{
    Catalog, CatalogIndexes, Error, Item, ItemId, Result, TermIndex, VectorIndex,
};

const FORMAT_VERSION: u32 = 1;

/// Locations of every index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub dir: PathBuf,
    pub terms: PathBuf,
    pub text: VectorFiles,
    pub image: VectorFiles,
}

/// The three files backing one vector space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorFiles {
    pub embeddings: PathBuf,
    pub ids: PathBuf,
    pub index: PathBuf,
}

impl VectorFiles {
    fn in_dir(dir: &Path, prefix: &str) -> Self {
        Self {
            embeddings: dir.join(format!("{}embeddings.bin", prefix)),
            ids: dir.join(format!("{}item_ids.bin", prefix)),
            index: dir.join(format!("{}vectors.idx", prefix)),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.embeddings, &self.ids, &self.index]
    }
}

impl IndexPaths {
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            terms: dir.join("terms.json"),
            text: VectorFiles::in_dir(&dir, ""),
            image: VectorFiles::in_dir(&dir, "image_"),
            dir,
        }
    }

    /// True when the required (non-image) files all exist.
    pub fn exists(&self) -> bool {
        self.terms.exists() && self.text.all().iter().all(|p| p.exists())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingMatrix {
    pub rows: usize,
    pub dim: usize,
    pub data: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndexHeader {
    pub version: u32,
    pub dim: usize,
    pub rows: usize,
    pub norms: Vec<f32>,
}

#[derive(Serialize)]
struct TermsFileRef<'a> {
    index: BTreeMap<&'a str, Vec<&'a ItemId>>,
    items: BTreeMap<&'a str, &'a Item>,
}

#[derive(Deserialize)]
struct TermsFile {
    index: BTreeMap<String, Vec<ItemId>>,
    items: BTreeMap<String, Item>,
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(bytes))
        .map_err(|e| Error::Persistence(format!("writing {}: {}", path.display(), e)))
}

fn read_existing(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::IndexNotFound(path.to_path_buf()));
    }
    Ok(fs::read(path)?)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_existing(path)?;
    bincode::deserialize(&bytes)
        .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e)))
}

/// Persist the term index together with the item records it refers to.
pub fn save_terms(terms: &TermIndex, catalog: &Catalog, path: &Path) -> Result<()> {
    let index = terms
        .postings()
        .map(|(token, ids)| {
            let mut ids: Vec<&ItemId> = ids.iter().collect();
            ids.sort_unstable();
            (token, ids)
        })
        .collect();
    let items = catalog
        .iter()
        .map(|item| (item.id.as_str(), &**item))
        .collect();
    let json = serde_json::to_vec(&TermsFileRef { index, items })?;
    write_atomic(path, &json)
}

/// Persist one vector space as matrix, id list and header.
pub fn save_vectors(index: &VectorIndex, files: &VectorFiles) -> Result<()> {
    let matrix = EmbeddingMatrix {
        rows: index.len(),
        dim: index.dim(),
        data: index.matrix().to_vec(),
    };
    let header = VectorIndexHeader {
        version: FORMAT_VERSION,
        dim: index.dim(),
        rows: index.len(),
        norms: index.norms().to_vec(),
    };
    write_atomic(&files.embeddings, &encode(&matrix)?)?;
    write_atomic(&files.ids, &encode(&index.ids().to_vec())?)?;
    write_atomic(&files.index, &encode(&header)?)
}

pub fn load_vectors(files: &VectorFiles) -> Result<VectorIndex> {
    let matrix: EmbeddingMatrix = decode(&files.embeddings)?;
    let ids: Vec<ItemId> = decode(&files.ids)?;
    let header: VectorIndexHeader = decode(&files.index)?;

    if header.version != FORMAT_VERSION {
        return Err(Error::Persistence(format!(
            "{}: unsupported format version {}",
            files.index.display(),
            header.version
        )));
    }
    if matrix.data.len() != matrix.rows * matrix.dim {
        return Err(Error::Persistence(format!(
            "{}: {} values for {} x {} matrix",
            files.embeddings.display(),
            matrix.data.len(),
            matrix.rows,
            matrix.dim
        )));
    }
    if matrix.rows != ids.len() {
        return Err(Error::IndexMismatch {
            embeddings: matrix.rows,
            ids: ids.len(),
        });
    }
    if header.rows != matrix.rows || header.dim != matrix.dim {
        return Err(Error::IndexMismatch {
            embeddings: matrix.rows,
            ids: header.rows,
        });
    }

    VectorIndex::from_parts(ids, matrix.dim, matrix.data, header.norms)
}

/// Load the catalog and term index; items come back in `order`.
fn load_terms(path: &Path, order: &[ItemId]) -> Result<(Catalog, TermIndex)> {
    let bytes = read_existing(path)?;
    let file: TermsFile = serde_json::from_slice(&bytes)?;
    let mut records = file.items;

    let mut items = Vec::with_capacity(order.len());
    for id in order {
        let item = records.remove(id.as_str()).ok_or_else(|| {
            Error::Persistence(format!("embedding row for {} has no item record", id))
        })?;
        items.push(item);
    }
    if let Some(extra) = records.keys().next() {
        return Err(Error::Persistence(format!(
            "item {} has no embedding row",
            extra
        )));
    }

    let catalog = Catalog::from_items(items)?;
    let terms = TermIndex::from_postings(file.index, &catalog)?;
    Ok((catalog, terms))
}

/// Every item embedding stored with the catalog must match its matrix row.
fn check_rows<'a, I>(records: I, index: &VectorIndex, files: &VectorFiles) -> Result<()>
where
    I: Iterator<Item = (&'a ItemId, &'a [f32])>,
{
    for (id, embedding) in records {
        let row = index.embedding(id.as_str()).ok_or_else(|| {
            Error::Persistence(format!("{}: no row for item {}", files.embeddings.display(), id))
        })?;
        let agrees = row.len() == embedding.len()
            && row
                .iter()
                .zip(embedding)
                .all(|(a, b)| (a - b).abs() <= 1e-6 * a.abs().max(1.0));
        if !agrees {
            return Err(Error::Persistence(format!(
                "{}: row for item {} disagrees with terms file",
                files.embeddings.display(),
                id
            )));
        }
    }
    Ok(())
}

/// Write every index file into `paths.dir`.
pub fn save_indexes(indexes: &CatalogIndexes, paths: &IndexPaths) -> Result<()> {
    fs::create_dir_all(&paths.dir)?;
    save_terms(&indexes.terms, &indexes.catalog, &paths.terms)?;
    save_vectors(&indexes.vectors, &paths.text)?;
    match &indexes.image_vectors {
        Some(images) => save_vectors(images, &paths.image)?,
        None => {
            // stale image files from an earlier build would be picked up on load
            for path in paths.image.all() {
                if path.exists() {
                    fs::remove_file(path)?;
                }
            }
        }
    }
    info!(
        dir = %paths.dir.display(),
        items = indexes.catalog.len(),
        tokens = indexes.terms.len(),
        "indexes saved"
    );
    Ok(())
}

/// Load and cross-validate every index file.
pub fn load_indexes(paths: &IndexPaths) -> Result<CatalogIndexes> {
    let vectors = load_vectors(&paths.text)?;
    let (catalog, terms) = load_terms(&paths.terms, vectors.ids())?;

    if !catalog.is_empty() && catalog.dim() != vectors.dim() {
        return Err(Error::InvalidDimension {
            expected: vectors.dim(),
            actual: catalog.dim(),
        });
    }

    check_rows(
        catalog.iter().map(|item| (&item.id, item.embedding.as_slice())),
        &vectors,
        &paths.text,
    )?;

    let image_files = paths.image.all();
    let image_vectors = if image_files.iter().any(|p| p.exists()) {
        let images = load_vectors(&paths.image)?;
        if let Some(stray) = images.ids().iter().find(|id| !catalog.contains(id.as_str())) {
            return Err(Error::Persistence(format!(
                "image index references unknown item {}",
                stray
            )));
        }
        check_rows(
            catalog.iter().filter_map(|item| {
                item.image_embedding
                    .as_ref()
                    .map(|e| (&item.id, e.as_slice()))
            }),
            &images,
            &paths.image,
        )?;
        Some(images)
    } else {
        None
    };

    debug!(
        items = catalog.len(),
        tokens = terms.len(),
        images = image_vectors.as_ref().map_or(0, VectorIndex::len),
        "indexes loaded"
    );
    Ok(CatalogIndexes {
        catalog,
        terms,
        vectors,
        image_vectors,
    })
}
