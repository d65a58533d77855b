use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::errors::StoreError;
use crate::file_utils::FileManager;
use crate::string_table::{MergeStats, StringTableCollection};

// @module: Localization store seam between the pipeline and collection assets

// @const: File suffix of collection assets inside the tables directory
pub const ASSET_SUFFIX: &str = ".tables.json";

/// Summary of one import pass over a store
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    /// Rows parsed out of the CSV (rows without a key are not counted)
    pub rows: usize,

    /// What merging those rows did to the collection
    pub stats: MergeStats,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} rows parsed ({})", self.rows, self.stats)
    }
}

/// Storage seam for localized string tables.
///
/// The pipeline only talks to this trait, so the file-backed store can be
/// swapped for an in-memory one in tests, or for a different asset layout
/// entirely.
pub trait LocalizationStore {
    /// Name of the collection this store operates on
    fn collection_name(&self) -> &str;

    /// Locale codes of the collection, in column order
    fn locales(&self) -> &[String];

    /// Number of entries in the collection
    fn entry_count(&self) -> usize;

    /// Whether the collection has no entries
    fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Write every entry as CSV. Returns the number of rows written.
    fn export_all(&self, writer: &mut dyn Write) -> Result<usize, StoreError>;

    /// Parse CSV from the reader and merge it into the collection
    fn import_all(&mut self, reader: &mut dyn Read) -> Result<ImportSummary, StoreError>;

    /// Make the current collection state durable
    fn persist(&mut self) -> Result<(), StoreError>;
}

/// File-backed store over a directory of collection assets.
///
/// Assets are JSON files named `<anything>.tables.json`, each holding one
/// serialized `StringTableCollection`. Which asset the store operates on
/// is resolved at open time and never guessed: with several candidates the
/// caller must name one.
pub struct DirectoryStore {
    dir: PathBuf,
    asset_path: PathBuf,
    collection: StringTableCollection,
}

impl DirectoryStore {
    /// Open the store, resolving which collection asset to operate on.
    ///
    /// Resolution rules:
    /// - no assets under the directory: `NoCollections`,
    /// - a name was given: the asset with that collection name, or
    ///   `UnknownCollection`; sibling assets that fail to load are
    ///   skipped with a warning,
    /// - exactly one asset: that one,
    /// - several assets and no name: `AmbiguousCollection`.
    pub fn open<P: AsRef<Path>>(dir: P, name: Option<&str>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();

        if !FileManager::dir_exists(&dir) {
            return Err(StoreError::NoCollections { dir });
        }

        let files = FileManager::find_files_with_suffix(&dir, ASSET_SUFFIX)?;
        if files.is_empty() {
            return Err(StoreError::NoCollections { dir });
        }

        let mut candidates = Vec::with_capacity(files.len());
        for path in files {
            match Self::load_asset(&path) {
                Ok(collection) => candidates.push((path, collection)),
                // A named selection only needs its own asset to load
                Err(error) if name.is_some() => {
                    warn!("Skipping unreadable collection asset {}: {}", path.display(), error);
                }
                Err(error) => return Err(error),
            }
        }

        let available = || {
            candidates
                .iter()
                .map(|(_, c)| c.name.clone())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let selected = match name {
            Some(name) => {
                match candidates.iter().position(|(_, c)| c.name == name) {
                    Some(idx) => idx,
                    None => {
                        return Err(StoreError::UnknownCollection {
                            name: name.to_string(),
                            dir,
                            available: available(),
                        })
                    }
                }
            }
            None if candidates.len() == 1 => 0,
            None => {
                return Err(StoreError::AmbiguousCollection {
                    count: candidates.len(),
                    dir,
                    available: available(),
                })
            }
        };

        let (asset_path, collection) = candidates.swap_remove(selected);
        collection
            .validate()
            .map_err(|e| StoreError::MalformedAsset {
                path: asset_path.clone(),
                detail: format!("{:#}", e),
            })?;

        debug!(
            "Opened collection {} from {} ({} entries, locales: {})",
            collection.name,
            asset_path.display(),
            collection.entry_count(),
            collection.locales.join(", ")
        );

        Ok(DirectoryStore {
            dir,
            asset_path,
            collection,
        })
    }

    fn load_asset(path: &Path) -> Result<StringTableCollection, StoreError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| StoreError::MalformedAsset {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Directory this store was opened on
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Asset file backing the selected collection
    pub fn asset_path(&self) -> &Path {
        &self.asset_path
    }

    /// The selected collection
    pub fn collection(&self) -> &StringTableCollection {
        &self.collection
    }
}

impl LocalizationStore for DirectoryStore {
    fn collection_name(&self) -> &str {
        &self.collection.name
    }

    fn locales(&self) -> &[String] {
        &self.collection.locales
    }

    fn entry_count(&self) -> usize {
        self.collection.entry_count()
    }

    fn export_all(&self, writer: &mut dyn Write) -> Result<usize, StoreError> {
        Ok(self.collection.write_csv(writer)?)
    }

    fn import_all(&mut self, reader: &mut dyn Read) -> Result<ImportSummary, StoreError> {
        let entries = StringTableCollection::read_csv(reader)?;
        let rows = entries.len();
        let stats = self.collection.merge(entries);
        Ok(ImportSummary { rows, stats })
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.collection).map_err(|e| {
            StoreError::MalformedAsset {
                path: self.asset_path.clone(),
                detail: e.to_string(),
            }
        })?;

        FileManager::write_to_file(&self.asset_path, &json)?;
        debug!(
            "Persisted collection {} to {}",
            self.collection.name,
            self.asset_path.display()
        );
        Ok(())
    }
}

/// In-memory store for tests and dry runs. `persist` only records that it
/// was called.
pub struct MemoryStore {
    collection: StringTableCollection,
    persisted: bool,
}

impl MemoryStore {
    /// Wrap a collection in an in-memory store
    pub fn new(collection: StringTableCollection) -> Self {
        MemoryStore {
            collection,
            persisted: false,
        }
    }

    /// The wrapped collection
    pub fn collection(&self) -> &StringTableCollection {
        &self.collection
    }

    /// Mutable access to the wrapped collection
    pub fn collection_mut(&mut self) -> &mut StringTableCollection {
        &mut self.collection
    }

    /// Whether `persist` has been called since construction
    pub fn was_persisted(&self) -> bool {
        self.persisted
    }
}

impl LocalizationStore for MemoryStore {
    fn collection_name(&self) -> &str {
        &self.collection.name
    }

    fn locales(&self) -> &[String] {
        &self.collection.locales
    }

    fn entry_count(&self) -> usize {
        self.collection.entry_count()
    }

    fn export_all(&self, writer: &mut dyn Write) -> Result<usize, StoreError> {
        Ok(self.collection.write_csv(writer)?)
    }

    fn import_all(&mut self, reader: &mut dyn Read) -> Result<ImportSummary, StoreError> {
        let entries = StringTableCollection::read_csv(reader)?;
        let rows = entries.len();
        let stats = self.collection.merge(entries);
        Ok(ImportSummary { rows, stats })
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        self.persisted = true;
        Ok(())
    }
}
