/*!
 * Error types for the locflow pipeline.
 *
 * This module contains custom error types for the store layer and the
 * pipeline stages, using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a localization store (file-backed or in-memory)
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A collection asset exists but could not be deserialized
    #[error("malformed collection asset {}: {detail}", .path.display())]
    MalformedAsset {
        /// Path of the offending asset file
        path: PathBuf,
        /// Deserialization failure message
        detail: String,
    },

    /// The store directory holds no collection assets at all
    #[error("no string table collection found under {}", .dir.display())]
    NoCollections {
        /// Directory that was scanned
        dir: PathBuf,
    },

    /// A collection was requested by name but is not present
    #[error("no string table collection named '{name}' under {} (available: {available})", .dir.display())]
    UnknownCollection {
        /// The requested collection name
        name: String,
        /// Directory that was scanned
        dir: PathBuf,
        /// Comma-separated names that were found instead
        available: String,
    },

    /// Several collections matched and none was explicitly selected
    #[error("{count} string table collections under {} ({available}); set `collection` to pick one", .dir.display())]
    AmbiguousCollection {
        /// Number of candidate collections
        count: usize,
        /// Directory that was scanned
        dir: PathBuf,
        /// Comma-separated candidate names
        available: String,
    },

    /// Collection data could not be scanned, parsed, merged or written
    #[error("{0}")]
    Data(String),
}

// Collection-level code works with anyhow; flatten it at the store boundary
impl From<anyhow::Error> for StoreError {
    fn from(error: anyhow::Error) -> Self {
        Self::Data(format!("{:#}", error))
    }
}

/// Errors that abort a pipeline run
///
/// Every variant is terminal for the current run: the runner aborts the
/// remaining stages and reports the failing stage alongside the error.
#[derive(Error, Debug)]
pub enum StageError {
    /// Export could not resolve a usable data source (absent or empty)
    #[error("no string table collection available: {detail}")]
    NoCollectionFound {
        /// What was looked for and where
        detail: String,
    },

    /// A stage's validation gate rejected the configuration
    #[error("configuration invalid: {reason}")]
    ConfigInvalid {
        /// Which field is wrong and how to fix it
        reason: String,
    },

    /// Writing the export CSV failed
    #[error("export to {} failed: {detail}", .path.display())]
    ExportError {
        /// Destination CSV path
        path: PathBuf,
        /// I/O or serialization failure message
        detail: String,
    },

    /// The translator script could not be run or exited non-zero
    #[error("translator script {} failed with {}: {detail}", .script.display(), exit_label(.code))]
    ScriptError {
        /// The script that was invoked
        script: PathBuf,
        /// Exit code, if the process ran to an exit at all
        code: Option<i32>,
        /// Captured stderr or the spawn failure message
        detail: String,
    },

    /// The translated CSV is not where the script should have written it
    #[error("translated CSV not found at {}", .path.display())]
    FileMissing {
        /// Expected path of the translated CSV
        path: PathBuf,
    },

    /// Parsing, merging, or persisting the translated CSV failed
    #[error("import from {} failed: {detail}", .path.display())]
    ImportError {
        /// Source CSV path
        path: PathBuf,
        /// Parse/merge/persist failure message
        detail: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}
