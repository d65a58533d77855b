/*!
 * Tests for the pipeline state machine.
 *
 * These tests drive the runner through an in-memory store and a mock
 * translator, so each stage outcome and state transition is observable
 * without touching a real tables directory or subprocess.
 */

use std::path::Path;

use anyhow::Result;
use locflow::app_config::Config;
use locflow::errors::StageError;
use locflow::pipeline::{Pipeline, PipelineState, Stage};
use locflow::store::MemoryStore;
use locflow::string_table::StringTableCollection;
use crate::common;
use crate::common::mock_translators::{MockOutcome, MockTranslator};

// ============================================================================
// State Machine Tests
// ============================================================================

#[test]
fn test_pipeline_withNewInstance_shouldStartIdle() {
    let pipeline = Pipeline::new(Config::default());

    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert!(!pipeline.state().is_terminal());
}

#[test]
fn test_pipelineState_withTerminalStates_shouldReportTerminal() {
    assert!(PipelineState::Done.is_terminal());
    assert!(PipelineState::Failed(Stage::Import).is_terminal());
    assert!(!PipelineState::Idle.is_terminal());
    assert!(!PipelineState::Exporting.is_terminal());
    assert!(!PipelineState::Translating.is_terminal());
    assert!(!PipelineState::Importing.is_terminal());
}

#[test]
fn test_pipelineState_withDisplay_shouldRenderStageNames() {
    assert_eq!(PipelineState::Idle.to_string(), "idle");
    assert_eq!(PipelineState::Done.to_string(), "done");
    assert_eq!(
        PipelineState::Failed(Stage::Translate).to_string(),
        "failed(Translate)"
    );
    assert_eq!(Stage::Export.to_string(), "Export");
}

// ============================================================================
// Full Run Tests
// ============================================================================

/// Test that a healthy run walks all three stages and persists the store
#[test]
fn test_run_withHealthyParts_shouldFinishDone() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    let export_csv = config.export_csv_path.clone();
    let translated_csv = config.translated_csv_path.clone();

    let mut store = MemoryStore::new(common::sample_collection("GameText"));
    let translator = MockTranslator::new(MockOutcome::Replace(
        "Hello,".to_string(),
        "Hello,안녕하세요".to_string(),
    ));
    let mut pipeline = Pipeline::new(config);

    tokio_test::block_on(pipeline.run_with_parts(&mut store, &translator))?;

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(translator.call_count(), 1);
    assert!(store.was_persisted());
    // The translated Korean value was merged back into the collection
    assert_eq!(
        store.collection().get("greeting").unwrap().value("ko"),
        Some("안녕하세요")
    );

    // The translator was handed the configured paths
    let tracker = translator.tracker();
    let tracker = tracker.lock().unwrap();
    assert_eq!(tracker.last_input.as_deref(), Some(Path::new(&export_csv)));
    assert_eq!(
        tracker.last_output.as_deref(),
        Some(Path::new(&translated_csv))
    );

    Ok(())
}

/// Test that an untouched CSV round trip leaves the collection unchanged
#[test]
fn test_run_withCopyTranslator_shouldLeaveEntriesUnchanged() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());

    let original = common::sample_collection("GameText");
    let mut store = MemoryStore::new(original.clone());
    let translator = MockTranslator::new(MockOutcome::CopyInput);
    let mut pipeline = Pipeline::new(config);

    tokio_test::block_on(pipeline.run_with_parts(&mut store, &translator))?;

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(store.collection().entries, original.entries);

    Ok(())
}

// ============================================================================
// Stage Failure Tests
// ============================================================================

/// Test that an empty collection aborts at Export before any translation
#[test]
fn test_run_withEmptyCollection_shouldFailAtExport() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());

    let empty = StringTableCollection::new("GameText", vec!["en".to_string()]);
    let mut store = MemoryStore::new(empty);
    let translator = MockTranslator::new(MockOutcome::CopyInput);
    let mut pipeline = Pipeline::new(config);

    let result = tokio_test::block_on(pipeline.run_with_parts(&mut store, &translator));

    assert!(matches!(result, Err(StageError::NoCollectionFound { .. })));
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Export));
    assert_eq!(translator.call_count(), 0);
    assert!(!store.was_persisted());

    Ok(())
}

/// Test that a translator failure aborts at Translate without persisting
#[test]
fn test_run_withFailingTranslator_shouldFailAtTranslate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());

    let mut store = MemoryStore::new(common::sample_collection("GameText"));
    let translator = MockTranslator::new(MockOutcome::FailWithCode(2));
    let mut pipeline = Pipeline::new(config);

    let result = tokio_test::block_on(pipeline.run_with_parts(&mut store, &translator));

    match result {
        Err(StageError::ScriptError { code, .. }) => assert_eq!(code, Some(2)),
        other => panic!("expected ScriptError, got {:?}", other),
    }
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Translate));
    assert_eq!(translator.call_count(), 1);
    assert!(!store.was_persisted());

    Ok(())
}

/// Test that a missing translated CSV aborts at Import
#[test]
fn test_run_withSilentTranslator_shouldFailAtImport() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());

    let mut store = MemoryStore::new(common::sample_collection("GameText"));
    let translator = MockTranslator::new(MockOutcome::WriteNothing);
    let mut pipeline = Pipeline::new(config);

    let result = tokio_test::block_on(pipeline.run_with_parts(&mut store, &translator));

    assert!(matches!(result, Err(StageError::FileMissing { .. })));
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Import));
    assert!(!store.was_persisted());

    Ok(())
}
