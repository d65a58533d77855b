use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};

use crate::app_config::Config;
use crate::errors::{StageError, StoreError};
use crate::file_utils::FileManager;
use crate::store::{DirectoryStore, ImportSummary, LocalizationStore};
use crate::translator::{ScriptTranslator, Translator};

// @module: Three-stage localization pipeline runner

/// One discrete step of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Export,
    Translate,
    Import,
}

impl Stage {
    // @returns: Capitalized stage name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Export => "Export",
            Self::Translate => "Translate",
            Self::Import => "Import",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Observable runner state.
///
/// `Done` and `Failed` are terminal; a failed run records which stage
/// aborted it. The runner never retries and never skips ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Exporting,
    Translating,
    Importing,
    Done,
    Failed(Stage),
}

impl PipelineState {
    /// Whether the run has ended, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Exporting => write!(f, "exporting"),
            PipelineState::Translating => write!(f, "translating"),
            PipelineState::Importing => write!(f, "importing"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Failed(stage) => write!(f, "failed({})", stage.display_name()),
        }
    }
}

/// Sequences the Export, Translate and Import stages over a store and a
/// translator. Each stage gates the next; the first failure aborts the
/// run with the failing stage recorded in the state.
pub struct Pipeline {
    // @field: App configuration, read-only during a run
    config: Config,

    // @field: Current state machine position
    state: PipelineState,
}

impl Pipeline {
    /// Create an idle pipeline over the given configuration
    pub fn new(config: Config) -> Self {
        Pipeline {
            config,
            state: PipelineState::Idle,
        }
    }

    /// Current state machine position
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run all three stages with the store and translator from the
    /// configuration
    pub async fn run(&mut self) -> Result<(), StageError> {
        // Resolving the data source is export work; its failures abort at Export
        self.transition(PipelineState::Exporting);
        let mut store = self.open_store().map_err(|e| self.fail(Stage::Export, e))?;
        let translator = ScriptTranslator::from_config(&self.config);
        self.run_with_parts(&mut store, &translator).await
    }

    /// Run all three stages over explicit collaborators.
    ///
    /// This is the seam tests use to substitute an in-memory store or a
    /// scripted translator for the real ones.
    pub async fn run_with_parts(
        &mut self,
        store: &mut dyn LocalizationStore,
        translator: &dyn Translator,
    ) -> Result<(), StageError> {
        info!(
            "🚀 locflow: collection {} ({} entries, locales: {})",
            store.collection_name(),
            store.entry_count(),
            store.locales().join(", ")
        );

        let progress_bar = Self::build_progress_bar();

        self.transition(PipelineState::Exporting);
        progress_bar.set_message("Exporting");
        match self.export_stage(store) {
            Ok(rows) => {
                info!("Exported {} entries to {}", rows, self.config.export_csv_path);
                progress_bar.inc(1);
            }
            Err(e) => {
                progress_bar.abandon_with_message("Export failed");
                return Err(self.fail(Stage::Export, e));
            }
        }

        self.transition(PipelineState::Translating);
        progress_bar.set_message("Translating");
        match self.translate_stage(translator).await {
            Ok(()) => {
                info!(
                    "Translated CSV written to {}",
                    self.config.translated_csv_path
                );
                progress_bar.inc(1);
            }
            Err(e) => {
                progress_bar.abandon_with_message("Translation failed");
                return Err(self.fail(Stage::Translate, e));
            }
        }

        self.transition(PipelineState::Importing);
        progress_bar.set_message("Importing");
        match self.import_stage(store) {
            Ok(summary) => {
                info!(
                    "Imported translations into {}: {}",
                    store.collection_name(),
                    summary
                );
                progress_bar.inc(1);
            }
            Err(e) => {
                progress_bar.abandon_with_message("Import failed");
                return Err(self.fail(Stage::Import, e));
            }
        }

        self.transition(PipelineState::Done);
        progress_bar.finish_with_message("Pipeline complete");
        Ok(())
    }

    /// Run only the export stage
    pub fn run_export(&mut self) -> Result<usize, StageError> {
        self.transition(PipelineState::Exporting);
        let store = self.open_store().map_err(|e| self.fail(Stage::Export, e))?;
        match self.export_stage(&store) {
            Ok(rows) => {
                info!("Exported {} entries to {}", rows, self.config.export_csv_path);
                self.transition(PipelineState::Done);
                Ok(rows)
            }
            Err(e) => Err(self.fail(Stage::Export, e)),
        }
    }

    /// Run only the translate stage
    pub async fn run_translate(&mut self) -> Result<(), StageError> {
        self.transition(PipelineState::Translating);
        let translator = ScriptTranslator::from_config(&self.config);
        match self.translate_stage(&translator).await {
            Ok(()) => {
                info!(
                    "Translated CSV written to {}",
                    self.config.translated_csv_path
                );
                self.transition(PipelineState::Done);
                Ok(())
            }
            Err(e) => Err(self.fail(Stage::Translate, e)),
        }
    }

    /// Run only the import stage
    pub fn run_import(&mut self) -> Result<ImportSummary, StageError> {
        self.transition(PipelineState::Importing);
        let mut store = self.open_store().map_err(|e| self.fail(Stage::Import, e))?;
        match self.import_stage(&mut store) {
            Ok(summary) => {
                info!("Imported translations into {}: {}", store.collection_name(), summary);
                self.transition(PipelineState::Done);
                Ok(summary)
            }
            Err(e) => Err(self.fail(Stage::Import, e)),
        }
    }

    // @creates: Directory store resolved from the configuration
    fn open_store(&self) -> Result<DirectoryStore, StageError> {
        DirectoryStore::open(&self.config.tables_dir, self.config.collection.as_deref())
            .map_err(resolution_error)
    }

    // @checks: Non-empty collection, then writes every entry as CSV
    fn export_stage(&self, store: &dyn LocalizationStore) -> Result<usize, StageError> {
        if store.is_empty() {
            return Err(StageError::NoCollectionFound {
                detail: format!("collection {} has no entries", store.collection_name()),
            });
        }

        let path = Path::new(&self.config.export_csv_path);
        let export_error = |detail: String| StageError::ExportError {
            path: path.to_path_buf(),
            detail,
        };

        FileManager::ensure_parent_dir(path).map_err(|e| export_error(format!("{:#}", e)))?;
        let file = File::create(path).map_err(|e| export_error(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        let rows = store
            .export_all(&mut writer)
            .map_err(|e| export_error(e.to_string()))?;
        writer.flush().map_err(|e| export_error(e.to_string()))?;

        Ok(rows)
    }

    // Validation and subprocess handling live in the translator itself
    async fn translate_stage(&self, translator: &dyn Translator) -> Result<(), StageError> {
        translator
            .translate(
                Path::new(&self.config.export_csv_path),
                Path::new(&self.config.translated_csv_path),
            )
            .await
    }

    // @checks: Translated CSV presence, then merges it and persists the store
    fn import_stage(&self, store: &mut dyn LocalizationStore) -> Result<ImportSummary, StageError> {
        let path = Path::new(&self.config.translated_csv_path);
        if !FileManager::file_exists(path) {
            return Err(StageError::FileMissing {
                path: path.to_path_buf(),
            });
        }

        let import_error = |detail: String| StageError::ImportError {
            path: path.to_path_buf(),
            detail,
        };

        let file = File::open(path).map_err(|e| import_error(e.to_string()))?;
        let mut reader = BufReader::new(file);
        let summary = store
            .import_all(&mut reader)
            .map_err(|e| import_error(e.to_string()))?;
        store
            .persist()
            .map_err(|e| import_error(format!("failed to persist: {}", e)))?;

        Ok(summary)
    }

    // @returns: Three-step bar in the standard style
    fn build_progress_bar() -> ProgressBar {
        let progress_bar = ProgressBar::new(3);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} stages {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{bar:30}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }

    fn transition(&mut self, next: PipelineState) {
        if self.state != next {
            debug!("Pipeline state: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn fail(&mut self, stage: Stage, error: StageError) -> StageError {
        error!("{} stage failed: {}", stage, error);
        self.transition(PipelineState::Failed(stage));
        error
    }
}

// Store resolution failures surface under the stage taxonomy: a usable
// collection that cannot be found is NoCollectionFound, while a selection
// the user must fix is ConfigInvalid.
fn resolution_error(error: StoreError) -> StageError {
    match error {
        StoreError::NoCollections { dir } => StageError::NoCollectionFound {
            detail: format!("none found under {}", dir.display()),
        },
        error @ (StoreError::UnknownCollection { .. } | StoreError::AmbiguousCollection { .. }) => {
            StageError::ConfigInvalid {
                reason: error.to_string(),
            }
        }
        error => StageError::NoCollectionFound {
            detail: error.to_string(),
        },
    }
}
