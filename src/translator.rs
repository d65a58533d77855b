/*!
 * Translator collaborators for the translate stage.
 *
 * The pipeline hands the exported CSV to a `Translator` and expects the
 * translated CSV at the output path afterwards. The shipped implementation
 * runs an external script through an interpreter; tests substitute mocks.
 */

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::process::Command;

use crate::app_config::{self, Config};
use crate::errors::StageError;
use crate::file_utils::FileManager;

/// Common trait for translate-stage collaborators
///
/// Implementations take the exported CSV and produce the translated CSV,
/// however they see fit. Failures use the pipeline's error taxonomy so the
/// runner can report them unchanged.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `input_csv`, writing the result to `output_csv`
    ///
    /// # Arguments
    /// * `input_csv` - Path of the exported source CSV
    /// * `output_csv` - Path the translated CSV must be written to
    ///
    /// # Returns
    /// * `Result<(), StageError>` - Ok when the output CSV was produced
    async fn translate(&self, input_csv: &Path, output_csv: &Path) -> Result<(), StageError>;
}

/// Runs an external translation script as a subprocess.
///
/// Invocation contract:
/// `<interpreter> <script> <api_key> <project_id> <input_csv> <output_csv>`,
/// exit code 0 means success. Both output streams are captured and logged,
/// also on success. No timeout is applied; the stage waits for the process.
#[derive(Debug, Clone)]
pub struct ScriptTranslator {
    interpreter: PathBuf,
    script: PathBuf,
    api_key: String,
    project_id: String,
}

impl ScriptTranslator {
    /// Create a translator from explicit parts
    pub fn new<I, S>(interpreter: I, script: S, api_key: String, project_id: String) -> Self
    where
        I: Into<PathBuf>,
        S: Into<PathBuf>,
    {
        ScriptTranslator {
            interpreter: interpreter.into(),
            script: script.into(),
            api_key,
            project_id,
        }
    }

    /// Create a translator from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.interpreter_path.as_str(),
            config.script_path.as_str(),
            config.api_key.clone(),
            config.project_id.clone(),
        )
    }

    // @checks: Script presence, then credentials; nothing is spawned on failure
    fn validate(&self) -> Result<(), StageError> {
        if !FileManager::file_exists(&self.script) {
            return Err(StageError::ConfigInvalid {
                reason: format!("translation script not found at {}", self.script.display()),
            });
        }

        app_config::validate_credential_values(&self.api_key, &self.project_id)
            .map_err(|e| StageError::ConfigInvalid {
                reason: format!("{:#}", e),
            })
    }
}

#[async_trait]
impl Translator for ScriptTranslator {
    async fn translate(&self, input_csv: &Path, output_csv: &Path) -> Result<(), StageError> {
        self.validate()?;

        info!(
            "Invoking translation script: {} {}",
            self.interpreter.display(),
            self.script.display()
        );
        debug!(
            "Script input: {}, output: {}",
            input_csv.display(),
            output_csv.display()
        );

        let output = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(&self.api_key)
            .arg(&self.project_id)
            .arg(input_csv)
            .arg(output_csv)
            .output()
            .await
            .map_err(|e| StageError::ScriptError {
                script: self.script.clone(),
                code: None,
                detail: format!("failed to start {}: {}", self.interpreter.display(), e),
            })?;

        // The script's own diagnostics are worth surfacing even on success
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            info!("Script output:\n{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            warn!("Script error output:\n{}", stderr.trim_end());
        }

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() {
                "script reported no error output".to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(StageError::ScriptError {
                script: self.script.clone(),
                code: output.status.code(),
                detail,
            });
        }

        Ok(())
    }
}
