/*!
 * End-to-end tests for the export, translate and import workflow.
 *
 * These tests run the full pipeline against a real directory store and
 * small /bin/sh scripts standing in for the translation script, then
 * inspect the persisted collection assets.
 */

use std::fs;
use std::path::Path;

use anyhow::Result;
use locflow::app_config::API_KEY_PLACEHOLDER;
use locflow::errors::StageError;
use locflow::file_utils::FileManager;
use locflow::pipeline::{Pipeline, PipelineState, Stage};
use crate::common;

/// Test that a healthy run exports, translates and imports end to end
#[test]
fn test_pipeline_withFillScript_shouldPersistTranslations() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let tables_dir = temp_dir.path().join("tables");
    fs::create_dir_all(&tables_dir)?;
    let asset_path = common::write_collection_asset(&tables_dir, &common::sample_collection("GameText"))?;

    let script = common::write_fill_script(temp_dir.path(), "translated")?;
    let mut config = common::test_config(temp_dir.path());
    config.script_path = common::path_string(&script);
    let export_csv = config.export_csv_path.clone();

    let mut pipeline = Pipeline::new(config);
    tokio_test::block_on(pipeline.run())?;

    assert_eq!(pipeline.state(), PipelineState::Done);

    // The sample leaves the Korean column empty, so the fill script
    // translated every entry
    let persisted = common::read_collection_asset(&asset_path)?;
    assert_eq!(persisted.get("greeting").unwrap().value("ko"), Some("translated"));
    assert_eq!(persisted.get("farewell").unwrap().value("ko"), Some("translated"));
    assert_eq!(
        persisted.get("prompt.continue").unwrap().value("ko"),
        Some("translated")
    );
    // English values were merged back unchanged
    assert_eq!(persisted.get("greeting").unwrap().value("en"), Some("Hello"));

    // The exported CSV is left on disk for inspection
    let exported = fs::read_to_string(&export_csv)?;
    assert_eq!(exported.lines().next(), Some("Key,Id,English(en),Korean(ko)"));

    Ok(())
}

/// Test that a copy script round trips the collection unchanged
#[test]
fn test_pipeline_withCopyScript_shouldRoundTripUnchanged() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let tables_dir = temp_dir.path().join("tables");
    fs::create_dir_all(&tables_dir)?;
    let collection = common::sample_collection("GameText");
    let asset_path = common::write_collection_asset(&tables_dir, &collection)?;

    let script = common::write_copy_script(temp_dir.path())?;
    let mut config = common::test_config(temp_dir.path());
    config.script_path = common::path_string(&script);

    let mut pipeline = Pipeline::new(config);
    tokio_test::block_on(pipeline.run())?;

    let persisted = common::read_collection_asset(&asset_path)?;
    assert_eq!(persisted.entries, collection.entries);
    assert_eq!(persisted.locales, collection.locales);

    Ok(())
}

/// Test that a failing script aborts the run and leaves the asset untouched
#[test]
fn test_pipeline_withFailingScript_shouldLeaveAssetUntouched() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let tables_dir = temp_dir.path().join("tables");
    fs::create_dir_all(&tables_dir)?;
    let asset_path = common::write_collection_asset(&tables_dir, &common::sample_collection("GameText"))?;
    let asset_before = fs::read_to_string(&asset_path)?;

    let script = common::write_failing_script(temp_dir.path())?;
    let mut config = common::test_config(temp_dir.path());
    config.script_path = common::path_string(&script);

    let mut pipeline = Pipeline::new(config);
    let result = tokio_test::block_on(pipeline.run());

    match result {
        Err(StageError::ScriptError { code, detail, .. }) => {
            assert_eq!(code, Some(3));
            assert!(detail.contains("translation backend unreachable"));
        }
        other => panic!("expected ScriptError, got {:?}", other),
    }
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Translate));
    assert_eq!(fs::read_to_string(&asset_path)?, asset_before);

    Ok(())
}

/// Test that a script writing no output fails the import stage
#[test]
fn test_pipeline_withSilentScript_shouldFailAtImport() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let tables_dir = temp_dir.path().join("tables");
    fs::create_dir_all(&tables_dir)?;
    common::write_collection_asset(&tables_dir, &common::sample_collection("GameText"))?;

    let script = common::write_silent_script(temp_dir.path())?;
    let mut config = common::test_config(temp_dir.path());
    config.script_path = common::path_string(&script);

    let mut pipeline = Pipeline::new(config);
    let result = tokio_test::block_on(pipeline.run());

    assert!(matches!(result, Err(StageError::FileMissing { .. })));
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Import));

    Ok(())
}

/// Test that an empty tables directory fails before anything is written
#[test]
fn test_pipeline_withEmptyTablesDir_shouldFailBeforeExportingAnything() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    fs::create_dir_all(temp_dir.path().join("tables"))?;

    let script = common::write_copy_script(temp_dir.path())?;
    let mut config = common::test_config(temp_dir.path());
    config.script_path = common::path_string(&script);
    let export_csv = config.export_csv_path.clone();

    let mut pipeline = Pipeline::new(config);
    let result = tokio_test::block_on(pipeline.run());

    assert!(matches!(result, Err(StageError::NoCollectionFound { .. })));
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Export));
    assert!(!Path::new(&export_csv).exists());

    Ok(())
}

/// Test that placeholder credentials stop the run before the script executes
#[test]
fn test_pipeline_withPlaceholderCredentials_shouldFailAtTranslate() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let tables_dir = temp_dir.path().join("tables");
    fs::create_dir_all(&tables_dir)?;
    common::write_collection_asset(&tables_dir, &common::sample_collection("GameText"))?;

    let script = common::write_copy_script(temp_dir.path())?;
    let mut config = common::test_config(temp_dir.path());
    config.script_path = common::path_string(&script);
    config.api_key = API_KEY_PLACEHOLDER.to_string();
    let translated_csv = config.translated_csv_path.clone();

    let mut pipeline = Pipeline::new(config);
    let result = tokio_test::block_on(pipeline.run());

    assert!(matches!(result, Err(StageError::ConfigInvalid { .. })));
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Translate));
    // The copy script never ran, so no translated CSV appeared
    assert!(!Path::new(&translated_csv).exists());

    Ok(())
}

/// Test that several collections require an explicit selection to run
#[test]
fn test_pipeline_withTwoCollections_shouldRequireExplicitSelection() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let tables_dir = temp_dir.path().join("tables");
    fs::create_dir_all(&tables_dir)?;
    common::write_collection_asset(&tables_dir, &common::sample_collection("GameText"))?;
    let menus_asset =
        common::write_collection_asset(&tables_dir, &common::sample_collection("Menus"))?;

    let script = common::write_fill_script(temp_dir.path(), "translated")?;
    let mut config = common::test_config(temp_dir.path());
    config.script_path = common::path_string(&script);

    // Without a selection the run is refused, naming the candidates
    let mut pipeline = Pipeline::new(config.clone());
    let result = tokio_test::block_on(pipeline.run());
    match result {
        Err(StageError::ConfigInvalid { reason }) => {
            assert!(reason.contains("GameText"));
            assert!(reason.contains("Menus"));
        }
        other => panic!("expected ConfigInvalid, got {:?}", other),
    }
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Export));

    // Naming a collection makes the same setup run to completion
    config.collection = Some("Menus".to_string());
    let mut pipeline = Pipeline::new(config);
    tokio_test::block_on(pipeline.run())?;

    assert_eq!(pipeline.state(), PipelineState::Done);
    let persisted = common::read_collection_asset(&menus_asset)?;
    assert_eq!(persisted.get("greeting").unwrap().value("ko"), Some("translated"));

    Ok(())
}

/// Test that the export stage alone writes the CSV and finishes
#[test]
fn test_run_export_withSampleCollection_shouldWriteCsv() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let tables_dir = temp_dir.path().join("tables");
    fs::create_dir_all(&tables_dir)?;
    common::write_collection_asset(&tables_dir, &common::sample_collection("GameText"))?;

    let config = common::test_config(temp_dir.path());
    let export_csv = config.export_csv_path.clone();

    let mut pipeline = Pipeline::new(config);
    let rows = pipeline.run_export()?;

    assert_eq!(rows, 3);
    assert_eq!(pipeline.state(), PipelineState::Done);
    let content = fs::read_to_string(&export_csv)?;
    assert_eq!(content.lines().next(), Some("Key,Id,English(en),Korean(ko)"));
    assert_eq!(content.lines().count(), 4);

    Ok(())
}

/// Test that the import stage alone merges a prepared CSV and persists it
#[test]
fn test_run_import_withPreparedCsv_shouldMergeAndPersist() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let tables_dir = temp_dir.path().join("tables");
    fs::create_dir_all(&tables_dir)?;
    let asset_path =
        common::write_collection_asset(&tables_dir, &common::sample_collection("GameText"))?;

    let config = common::test_config(temp_dir.path());
    FileManager::write_to_file(
        &config.translated_csv_path,
        "Key,Id,English(en),Korean(ko)\ngreeting,1,Hello,안녕하세요\nnew.key,0,Fresh,\n",
    )?;

    let mut pipeline = Pipeline::new(config);
    let summary = pipeline.run_import()?;

    assert_eq!(summary.rows, 2);
    assert_eq!(summary.stats.updated, 1);
    assert_eq!(summary.stats.added, 1);
    assert_eq!(pipeline.state(), PipelineState::Done);

    let persisted = common::read_collection_asset(&asset_path)?;
    assert_eq!(persisted.get("greeting").unwrap().value("ko"), Some("안녕하세요"));
    // The new key was appended with the next free id
    let added = persisted.get("new.key").unwrap();
    assert_eq!(added.id, 4);
    assert_eq!(added.value("en"), Some("Fresh"));

    Ok(())
}

/// Test that the translate stage alone fails cleanly when export never ran
#[test]
fn test_run_translate_withMissingExportCsv_shouldFailAtTranslate() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;

    let script = common::write_copy_script(temp_dir.path())?;
    let mut config = common::test_config(temp_dir.path());
    config.script_path = common::path_string(&script);

    let mut pipeline = Pipeline::new(config);
    // The copy script exits non-zero because its input is absent
    let result = tokio_test::block_on(pipeline.run_translate());

    assert!(matches!(result, Err(StageError::ScriptError { .. })));
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Translate));

    Ok(())
}
