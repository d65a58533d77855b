// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::Path;

use crate::app_config::{Config, LogLevel};
use crate::pipeline::Pipeline;

mod app_config;
mod errors;
mod file_utils;
mod locale_utils;
mod pipeline;
mod store;
mod string_table;
mod translator;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full export, translate and import pipeline (default command)
    Run,

    /// Export the collection to the configured CSV path
    Export,

    /// Run the translation script over an already exported CSV
    Translate,

    /// Import a translated CSV back into the collection
    Import,

    /// Generate shell completions for locflow
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// locflow - Localization CSV translation pipeline
///
/// Exports a string table collection to CSV, runs an external translation
/// script over it, and imports the translated CSV back into the collection.
#[derive(Parser, Debug)]
#[command(name = "locflow")]
#[command(author = "locflow team")]
#[command(version = "0.2.1")]
#[command(about = "Localization string table translation pipeline")]
#[command(long_about = "locflow exports a localization string table collection to CSV, hands it to
an external translation script, and imports the translated CSV back into the
collection, persisting the result.

EXAMPLES:
    locflow                                   # Run the full pipeline with conf.json
    locflow run --collection GameStrings      # Pick one of several collections
    locflow export                            # Only write the source CSV
    locflow translate --script ./translate.py # Only run the translation script
    locflow import                            # Only merge the translated CSV back
    locflow --log-level debug run             # Full pipeline with debug logging
    locflow completions bash > locflow.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically; its credential fields are placeholders that
    must be replaced (or overridden with --api-key/--project-id) before the
    translate stage will run.

SUBPROCESS CONTRACT:
    <interpreter> <script> <api_key> <project_id> <input_csv> <output_csv>
    Exit code 0 means success; stdout/stderr are captured and logged.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long = "config", global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Translation API key passed to the script
    #[arg(long, global = true, env = "LOCFLOW_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Translation project id passed to the script
    #[arg(long, global = true, env = "LOCFLOW_PROJECT_ID")]
    project_id: Option<String>,

    /// Directory holding the string table collection assets
    #[arg(long, global = true)]
    tables_dir: Option<String>,

    /// Collection name, required when the tables directory holds several
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Where the export stage writes the source CSV
    #[arg(long, global = true)]
    export_csv: Option<String>,

    /// Translation script to run between export and import
    #[arg(long, global = true)]
    script: Option<String>,

    /// Where the script is expected to write the translated CSV
    #[arg(long, global = true)]
    translated_csv: Option<String>,

    /// Interpreter used to run the translation script
    #[arg(long, global = true)]
    interpreter: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color sequence for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let emoji = Self::get_emoji_for_level(record.level());
            let color = Self::get_color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    run_app(cli).await
}

async fn run_app(options: CommandLineOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let log_level: LogLevel = cmd_log_level.clone().into();
        log::set_max_level(log_level.to_level_filter());
    }

    // Handle subcommands
    match options.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "locflow", &mut std::io::stdout());
        }
        None | Some(Commands::Run) => {
            build_pipeline(&options)?.run().await?;
        }
        Some(Commands::Export) => {
            build_pipeline(&options)?.run_export()?;
        }
        Some(Commands::Translate) => {
            build_pipeline(&options)?.run_translate().await?;
        }
        Some(Commands::Import) => {
            build_pipeline(&options)?.run_import()?;
        }
    }

    Ok(())
}

// Load the configuration, apply CLI overrides and build the pipeline
fn build_pipeline(options: &CommandLineOptions) -> Result<Pipeline> {
    let config_path = &options.config_path;
    if !Path::new(config_path).exists() {
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path
        );
    }
    let mut config = Config::load_or_create(config_path)?;

    // Override config with CLI options if provided
    apply_overrides(&mut config, options);

    // Validate the configuration after loading and overriding
    config
        .validate()
        .context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(Pipeline::new(config))
}

// Apply command line overrides onto the loaded configuration
fn apply_overrides(config: &mut Config, options: &CommandLineOptions) {
    if let Some(api_key) = &options.api_key {
        config.api_key = api_key.clone();
    }

    if let Some(project_id) = &options.project_id {
        config.project_id = project_id.clone();
    }

    if let Some(tables_dir) = &options.tables_dir {
        config.tables_dir = tables_dir.clone();
    }

    if let Some(collection) = &options.collection {
        config.collection = Some(collection.clone());
    }

    if let Some(export_csv) = &options.export_csv {
        config.export_csv_path = export_csv.clone();
    }

    if let Some(script) = &options.script {
        config.script_path = script.clone();
    }

    if let Some(translated_csv) = &options.translated_csv {
        config.translated_csv_path = translated_csv.clone();
    }

    if let Some(interpreter) = &options.interpreter {
        config.interpreter_path = interpreter.clone();
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}
