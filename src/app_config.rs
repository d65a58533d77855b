use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::file_utils::FileManager;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.

/// Value shipped in a freshly created config until the user supplies a real API key
pub const API_KEY_PLACEHOLDER: &str = "YOUR_TRANSLATION_API_KEY_HERE";

/// Value shipped in a freshly created config until the user supplies a real project id
pub const PROJECT_ID_PLACEHOLDER: &str = "YOUR_TRANSLATION_PROJECT_ID_HERE";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// API key handed to the translation script as its first argument
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Project identifier handed to the translation script as its second argument
    #[serde(default = "default_project_id")]
    pub project_id: String,

    /// Directory scanned for string table collection assets
    #[serde(default = "default_tables_dir")]
    pub tables_dir: String,

    /// Collection to operate on; required when the tables directory holds more than one
    #[serde(default)]
    pub collection: Option<String>,

    /// Where the export stage writes the source CSV
    #[serde(default = "default_export_csv_path")]
    pub export_csv_path: String,

    /// Translation script invoked between export and import
    #[serde(default = "default_script_path")]
    pub script_path: String,

    /// Where the script is expected to write the translated CSV
    #[serde(default = "default_translated_csv_path")]
    pub translated_csv_path: String,

    /// Interpreter used to run the translation script
    #[serde(default = "default_interpreter_path")]
    pub interpreter_path: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching filter for the log facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_api_key() -> String {
    API_KEY_PLACEHOLDER.to_string()
}

fn default_project_id() -> String {
    PROJECT_ID_PLACEHOLDER.to_string()
}

fn default_tables_dir() -> String {
    "LocalizationData/Tables".to_string()
}

fn default_export_csv_path() -> String {
    "LocalizationData/ExportedStrings.csv".to_string()
}

fn default_script_path() -> String {
    "scripts/translation_script.py".to_string()
}

fn default_translated_csv_path() -> String {
    "LocalizationData/ExportedStrings_translated.csv".to_string()
}

fn default_interpreter_path() -> String {
    "python3".to_string()
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .context(format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load the configuration, writing a default file first if none exists
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if FileManager::file_exists(path) {
            Self::load(path)
        } else {
            let config = Config::default();
            config.save(path)?;
            log::debug!("Created default configuration at {}", path.display());
            Ok(config)
        }
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        FileManager::write_to_file(path, &config_json)
            .context(format!("Failed to write config to file: {}", path.display()))?;

        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.tables_dir.trim().is_empty() {
            return Err(anyhow!("Tables directory must not be empty"));
        }

        if self.export_csv_path.trim().is_empty() {
            return Err(anyhow!("Export CSV path must not be empty"));
        }

        if self.script_path.trim().is_empty() {
            return Err(anyhow!("Translation script path must not be empty"));
        }

        if self.translated_csv_path.trim().is_empty() {
            return Err(anyhow!("Translated CSV path must not be empty"));
        }

        if self.interpreter_path.trim().is_empty() {
            return Err(anyhow!("Interpreter path must not be empty"));
        }

        if let Some(name) = &self.collection {
            if name.trim().is_empty() {
                return Err(anyhow!("Collection name, when set, must not be empty"));
            }
        }

        Ok(())
    }

    /// Check that the script credentials have been filled in.
    /// A fresh config ships with placeholder values that must be replaced
    /// before the translation script can be run.
    pub fn validate_credentials(&self) -> Result<()> {
        validate_credential_values(&self.api_key, &self.project_id)
    }
}

/// Check credential values for emptiness and the shipped placeholders
pub fn validate_credential_values(api_key: &str, project_id: &str) -> Result<()> {
    if api_key.trim().is_empty() || api_key == API_KEY_PLACEHOLDER {
        return Err(anyhow!(
            "Translation API key is not set; edit the config file or pass --api-key"
        ));
    }

    if project_id.trim().is_empty() || project_id == PROJECT_ID_PLACEHOLDER {
        return Err(anyhow!(
            "Translation project id is not set; edit the config file or pass --project-id"
        ));
    }

    Ok(())
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: default_api_key(),
            project_id: default_project_id(),
            tables_dir: default_tables_dir(),
            collection: None,
            export_csv_path: default_export_csv_path(),
            script_path: default_script_path(),
            translated_csv_path: default_translated_csv_path(),
            interpreter_path: default_interpreter_path(),
            log_level: LogLevel::default(),
        }
    }
}
