/*!
 * Integration tests running the pipeline jobs over a project on disk
 */

use anyhow::Result;
use novelforge::jobs::JobReport;
use novelforge::jobs::merge::CHAPTER_SEPARATOR;
use novelforge::ledger::ErrorLedger;
use novelforge::providers::mock::{MockTokenCounter, MockTranslator};
use novelforge::reconcile::UnitStatus;
use novelforge::token_cache::TokenCount;
use novelforge::{Controller, FinishState, JobOutcome};
use crate::common;

async fn follow(events: tokio::sync::mpsc::UnboundedReceiver<novelforge::JobEvent>) -> JobOutcome {
    Controller::follow(events, false).await.expect("job sent no Finished event")
}

/// Test the full path from raw chapters to a merged archive file
#[tokio::test]
async fn test_pipeline_withWorkingTranslator_shouldTranslateCleanAndMerge() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[
        ("page_1.txt", "Site banner\n**Chapter 1**\nFirst"),
        ("page_2.txt", "Site banner\n**Chapter 2**\nSecond"),
    ])?;
    let translator = MockTranslator::working();
    let controller = common::mock_controller(&layout, &translator, &MockTokenCounter::new());

    let translated = follow(controller.start_translation(false).await).await;
    assert_eq!(translated.state, FinishState::Completed);

    let files = controller.translated_files();
    assert_eq!(files.len(), 2);
    let cleaned = follow(controller.start_clean(files.clone()).await).await;
    assert!(cleaned.unit_failures.is_empty());
    assert_eq!(common::read(&files[0]), "**Chapter 1**\nFirst");

    let merged = follow(controller.start_merge(files).await).await;
    let output = match merged.report {
        Some(JobReport::Merge(report)) => report.output,
        other => panic!("unexpected report: {:?}", other),
    };
    assert_eq!(
        common::read(&output),
        format!("{sep}**Chapter 1**\nFirst{sep}**Chapter 2**\nSecond", sep = CHAPTER_SEPARATOR)
    );

    let units = controller.reconcile();
    let statuses: Vec<&UnitStatus> = units.iter().map(|unit| &unit.status).collect();
    assert_eq!(statuses, vec![&UnitStatus::Archived, &UnitStatus::Translated, &UnitStatus::Translated]);
    Ok(())
}

/// Test that a second translation run makes no calls
#[tokio::test]
async fn test_translation_withSecondRun_shouldBeIdempotent() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "a"), ("page_2.txt", "b"), ("page_3.txt", "c")])?;
    let translator = MockTranslator::working();
    let controller = common::mock_controller(&layout, &translator, &MockTokenCounter::new());

    follow(controller.start_translation(false).await).await;
    let calls_after_first = translator.call_count();
    follow(controller.start_translation(false).await).await;

    assert_eq!(calls_after_first, 3);
    assert_eq!(translator.call_count(), 3);
    Ok(())
}

/// Test that a persistently rate-limited unit is attempted three times and recorded
#[tokio::test]
async fn test_translation_withPersistentRateLimit_shouldRecordAfterThreeAttempts() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "Hello")])?;
    let translator = MockTranslator::failing();
    let controller = common::mock_controller(&layout, &translator, &MockTokenCounter::new());

    let outcome = follow(controller.start_translation(false).await).await;

    assert_eq!(translator.call_count(), 3);
    assert_eq!(outcome.unit_failures.len(), 1);
    let ledger = ErrorLedger::load(layout.translation_ledger_path());
    assert!(ledger.get("page_1.txt").is_some_and(|message| message.contains("429")));
    assert!(matches!(controller.reconcile()[0].status, UnitStatus::TranslationFailed(_)));
    Ok(())
}

/// Test the chapter-check scenario on a chapter without heading
#[tokio::test]
async fn test_chapter_check_withoutHeading_shouldPrependPlaceholder() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[])?;
    let path = common::create_test_file(&layout.translated_dir(), "translated_page_1.txt", "It was dark.\nRain fell.")?;
    let controller = common::mock_controller(&layout, &MockTranslator::working(), &MockTokenCounter::new());

    follow(controller.start_chapter_check(vec![path.clone()]).await).await;

    assert_eq!(common::read(&path), "Untitled Chapter\nIt was dark.\nRain fell.");
    assert_eq!(
        common::read(&layout.chapter_check_dir().join("missing.txt")),
        "translated_page_1.txt\n"
    );
    Ok(())
}

/// Test that the clean job leaves a chapter without marker byte-identical
#[tokio::test]
async fn test_clean_withoutMarker_shouldLeaveFileIdentical() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "Hello")])?;
    let controller = common::mock_controller(&layout, &MockTranslator::working(), &MockTokenCounter::new());

    let outcome = follow(controller.start_clean(vec![layout.raw_path("page_1.txt")]).await).await;

    assert_eq!(outcome.state, FinishState::Completed);
    assert_eq!(std::fs::read(layout.raw_path("page_1.txt"))?, b"Hello");
    assert!(matches!(controller.reconcile()[0].status, UnitStatus::CleaningFailed(_)));
    Ok(())
}

/// Test that token counts appear in the reconciled view after a sweep
#[tokio::test]
async fn test_token_sweep_withProject_shouldFeedReconciledCounts() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "one two three")])?;
    let counter = MockTokenCounter::new();
    let controller = common::mock_controller(&layout, &MockTranslator::working(), &counter);

    assert_eq!(controller.reconcile()[0].original_tokens, Some(TokenCount::NotComputed));
    follow(controller.start_token_sweep().await).await;
    follow(controller.start_token_sweep().await).await;

    assert_eq!(counter.call_count(), 1);
    assert_eq!(controller.reconcile()[0].original_tokens, Some(TokenCount::Counted(3)));
    Ok(())
}
