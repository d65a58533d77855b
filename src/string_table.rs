use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::{Read, Write};

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::locale_utils;

// @module: String table collections and their CSV codec

// @const: Header name of the entry key column
pub const KEY_COLUMN: &str = "Key";

// @const: Header name of the numeric id column
pub const ID_COLUMN: &str = "Id";

// @struct: Single localized entry across locales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    // @field: Entry key, unique within a collection
    pub key: String,

    // @field: Numeric id, stable across export/import
    pub id: u64,

    // @field: Localized values keyed by locale code
    pub values: BTreeMap<String, String>,
}

impl TableEntry {
    /// Creates a new entry with no localized values
    pub fn new<S: Into<String>>(key: S, id: u64) -> Self {
        TableEntry {
            key: key.into(),
            id,
            values: BTreeMap::new(),
        }
    }

    /// Get the value for a locale, if present
    pub fn value(&self, locale: &str) -> Option<&str> {
        self.values.get(locale).map(String::as_str)
    }

    /// Set the value for a locale, replacing any previous value
    pub fn set_value<L: Into<String>, V: Into<String>>(&mut self, locale: L, value: V) {
        self.values.insert(locale.into(), value.into());
    }
}

/// Collection of localized entries sharing a key set and locale list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringTableCollection {
    /// Collection name
    pub name: String,

    /// Locale codes, in CSV column order
    pub locales: Vec<String>,

    /// Entries in export order
    pub entries: Vec<TableEntry>,
}

/// Outcome counts of merging a parsed CSV into a collection
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeStats {
    /// Entries appended for keys the collection did not have
    pub added: usize,

    /// Existing entries that received at least one value
    pub updated: usize,

    /// Rows that matched an existing key but carried nothing applicable
    pub skipped: usize,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} added, {} updated, {} skipped",
            self.added, self.updated, self.skipped
        )
    }
}

impl StringTableCollection {
    /// Create an empty collection for the given locales
    pub fn new<S: Into<String>>(name: S, locales: Vec<String>) -> Self {
        StringTableCollection {
            name: name.into(),
            locales,
            entries: Vec::new(),
        }
    }

    // @checks: Name, locale list and entry key/id uniqueness
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("Collection name must not be empty"));
        }

        if self.locales.is_empty() {
            return Err(anyhow!("Collection {} declares no locales", self.name));
        }

        for locale in &self.locales {
            locale_utils::validate_locale_code(locale)
                .with_context(|| format!("Collection {}", self.name))?;
        }

        for (i, a) in self.locales.iter().enumerate() {
            for b in self.locales.iter().skip(i + 1) {
                if locale_utils::locale_codes_match(a, b) {
                    return Err(anyhow!(
                        "Collection {} lists locale {} twice",
                        self.name, a
                    ));
                }
            }
        }

        let mut keys = HashSet::new();
        let mut ids = HashSet::new();
        for entry in &self.entries {
            if entry.key.trim().is_empty() {
                return Err(anyhow!("Collection {} contains an empty key", self.name));
            }
            if !keys.insert(entry.key.as_str()) {
                return Err(anyhow!(
                    "Collection {} contains duplicate key {}",
                    self.name, entry.key
                ));
            }
            if !ids.insert(entry.id) {
                return Err(anyhow!(
                    "Collection {} contains duplicate id {}",
                    self.name, entry.id
                ));
            }
        }

        Ok(())
    }

    /// Number of entries in the collection
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by key
    pub fn get(&self, key: &str) -> Option<&TableEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Look up an entry by key for mutation
    pub fn get_mut(&mut self, key: &str) -> Option<&mut TableEntry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }

    /// Append an entry. The caller is responsible for key uniqueness.
    pub fn add_entry(&mut self, entry: TableEntry) {
        self.entries.push(entry);
    }

    /// One past the current maximum id, saturating at the top of the id range
    pub fn next_id(&self) -> u64 {
        self.entries.iter().map(|e| e.id).max().map_or(1, |max| max.saturating_add(1))
    }

    /// CSV header row: key and id columns followed by one column per locale
    pub fn csv_header(&self) -> Vec<String> {
        let mut header = vec![KEY_COLUMN.to_string(), ID_COLUMN.to_string()];
        header.extend(self.locales.iter().map(|loc| locale_utils::locale_column_header(loc)));
        header
    }

    /// Write the collection as UTF-8 CSV, one row per entry.
    /// Values with commas, quotes or newlines are quoted by the writer.
    /// Returns the number of entry rows written.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(&self.csv_header())
            .context("Failed to write CSV header")?;

        for entry in &self.entries {
            let mut row = Vec::with_capacity(2 + self.locales.len());
            row.push(entry.key.clone());
            row.push(entry.id.to_string());
            for locale in &self.locales {
                row.push(entry.value(locale).unwrap_or_default().to_string());
            }
            csv_writer
                .write_record(&row)
                .context(format!("Failed to write CSV row for key {}", entry.key))?;
        }

        csv_writer.flush().context("Failed to flush CSV output")?;
        Ok(self.entries.len())
    }

    /// Parse a CSV stream into entries.
    ///
    /// The header must contain a Key column; an Id column and locale
    /// columns (either `Name(code)` or a bare code) are optional and may
    /// appear in any order. Unrecognized columns are skipped with a
    /// warning. Rows may be shorter than the header; missing or empty
    /// cells leave the locale untouched when the result is merged.
    pub fn read_csv<R: Read>(reader: R) -> Result<Vec<TableEntry>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .context("Failed to read CSV header")?
            .clone();

        let mut key_col: Option<usize> = None;
        let mut id_col: Option<usize> = None;
        let mut locale_cols: Vec<(usize, String)> = Vec::new();

        for (idx, name) in headers.iter().enumerate() {
            let trimmed = name.trim();
            if key_col.is_none() && trimmed.eq_ignore_ascii_case(KEY_COLUMN) {
                key_col = Some(idx);
            } else if id_col.is_none() && trimmed.eq_ignore_ascii_case(ID_COLUMN) {
                id_col = Some(idx);
            } else if let Some(code) = locale_utils::parse_locale_header(trimmed) {
                locale_cols.push((idx, code));
            } else {
                warn!("Ignoring unrecognized CSV column: {}", trimmed);
            }
        }

        let key_col = key_col.ok_or_else(|| anyhow!("CSV header has no Key column"))?;

        let mut entries = Vec::new();
        for (row_num, result) in csv_reader.records().enumerate() {
            let record = result.context(format!("Failed to parse CSV row {}", row_num + 1))?;

            let key = record.get(key_col).unwrap_or_default().trim();
            if key.is_empty() {
                debug!("Skipping CSV row {} with empty key", row_num + 1);
                continue;
            }

            let id = match id_col.and_then(|idx| record.get(idx)) {
                Some(raw) if !raw.trim().is_empty() => match raw.trim().parse::<u64>() {
                    Ok(id) => id,
                    Err(_) => {
                        warn!("CSV row {}: ignoring unparsable id {:?}", row_num + 1, raw);
                        0
                    }
                },
                _ => 0,
            };

            let mut entry = TableEntry::new(key, id);
            for (idx, code) in &locale_cols {
                if let Some(value) = record.get(*idx) {
                    if !value.is_empty() {
                        entry.set_value(code.clone(), value);
                    }
                }
            }

            entries.push(entry);
        }

        Ok(entries)
    }

    /// Merge parsed CSV entries into the collection.
    ///
    /// Rows matching an existing key update that entry's values and keep
    /// its id. Rows with new keys are appended; their CSV id is kept when
    /// it is free, otherwise the next free id is allocated. Values for
    /// locales the collection does not declare are dropped with a warning.
    pub fn merge(&mut self, incoming: Vec<TableEntry>) -> MergeStats {
        let mut stats = MergeStats::default();
        let mut used_ids: HashSet<u64> = self.entries.iter().map(|e| e.id).collect();
        let mut next_id = self.next_id();
        let mut warned_locales: HashSet<String> = HashSet::new();

        let locales = self.locales.clone();
        let canonical = |code: &str| {
            locales
                .iter()
                .find(|loc| locale_utils::locale_codes_match(loc, code))
                .cloned()
        };

        for row in incoming {
            let mut applicable: Vec<(String, String)> = Vec::new();
            for (code, value) in row.values {
                match canonical(&code) {
                    Some(locale) => applicable.push((locale, value)),
                    None => {
                        if warned_locales.insert(code.clone()) {
                            warn!(
                                "Dropping values for locale {} not declared by collection {}",
                                code, self.name
                            );
                        }
                    }
                }
            }

            if let Some(existing) = self.entries.iter_mut().find(|e| e.key == row.key) {
                if applicable.is_empty() {
                    stats.skipped += 1;
                } else {
                    for (locale, value) in applicable {
                        existing.values.insert(locale, value);
                    }
                    stats.updated += 1;
                }
            } else {
                let id = if row.id != 0 && !used_ids.contains(&row.id) {
                    row.id
                } else {
                    lowest_free_id(&used_ids, next_id)
                };
                used_ids.insert(id);
                if id >= next_id {
                    next_id = id.saturating_add(1);
                }

                let mut entry = TableEntry::new(row.key, id);
                for (locale, value) in applicable {
                    entry.values.insert(locale, value);
                }
                self.entries.push(entry);
                stats.added += 1;
            }
        }

        stats
    }
}

// Lowest unused id at or above the cursor. When the top of the id range is
// taken the scan wraps to the low end once; any collection that fits in
// memory leaves some id free down there.
fn lowest_free_id(used_ids: &HashSet<u64>, from: u64) -> u64 {
    let mut candidate = from.max(1);
    loop {
        if !used_ids.contains(&candidate) {
            return candidate;
        }
        candidate = match candidate.checked_add(1) {
            Some(next) => next,
            None => 1,
        };
    }
}
