/*!
 * Integration tests for the controller and job lifecycle
 */

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use novelforge::app_config::Config;
use novelforge::providers::mock::{MockScraper, MockTokenCounter, MockTranslator};
use novelforge::{Controller, FinishState, JobEvent, JobKind, ProjectLayout};
use crate::common;

/// Test that stopping a translation during its backoff returns within one polling slice
#[tokio::test]
async fn test_stop_withTranslationInBackoff_shouldHaltWithinOneSlice() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "Hello")])?;
    let mut config = Config::default();
    config.translation.backoff_unit_ms = 5_000;
    config.translation.poll_interval_ms = 50;
    let controller = Controller::new(layout.clone(), config).with_translator(Arc::new(MockTranslator::failing()));

    let events = controller.start_translation(false).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let stopped_at = Instant::now();
    assert!(controller.stop(JobKind::Translate));
    let outcome = Controller::follow(events, false).await.expect("finished");

    assert!(stopped_at.elapsed() <= Duration::from_millis(500));
    assert_eq!(outcome.state, FinishState::Cancelled);
    Ok(())
}

/// Test that a paused translation does not start new calls until resumed
#[tokio::test]
async fn test_pause_withSlowTranslator_shouldHoldNextUnit() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "a"), ("page_2.txt", "b")])?;
    let translator = MockTranslator::slow(100);
    let controller = common::mock_controller(&layout, &translator, &MockTokenCounter::new());

    let events = controller.start_translation(false).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(controller.pause(JobKind::Translate));
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(translator.call_count(), 1);
    assert!(controller.is_paused(JobKind::Translate));

    controller.resume(JobKind::Translate);
    let outcome = Controller::follow(events, false).await.expect("finished");
    assert_eq!(outcome.state, FinishState::Completed);
    assert_eq!(translator.call_count(), 2);
    Ok(())
}

/// Test that a pause during retry backoff neither retries nor lets the backoff run out
#[tokio::test]
async fn test_pause_withTranslationInBackoff_shouldFreezeRetries() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "Hello")])?;
    let mut config = Config::default();
    config.translation.backoff_unit_ms = 100;
    config.translation.poll_interval_ms = 20;
    let translator = MockTranslator::failing();
    let controller = Controller::new(layout.clone(), config).with_translator(Arc::new(translator.clone()));

    let events = controller.start_translation(false).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(translator.call_count(), 1);
    assert!(controller.pause(JobKind::Translate));
    tokio::time::sleep(Duration::from_millis(800)).await;

    assert_eq!(translator.call_count(), 1);
    assert!(controller.is_paused(JobKind::Translate));
    assert!(controller.is_running(JobKind::Translate));

    controller.resume(JobKind::Translate);
    let outcome = Controller::follow(events, false).await.expect("finished");
    assert_eq!(outcome.state, FinishState::Completed);
    assert_eq!(translator.call_count(), 3);
    assert_eq!(outcome.unit_failures.len(), 1);
    Ok(())
}

/// Test that starting the same job kind again cancels the previous run first
#[tokio::test]
async fn test_start_withSameKindRunning_shouldCancelPrevious() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "a"), ("page_2.txt", "b")])?;
    let mut config = Config::default();
    config.translation.backoff_unit_ms = 5_000;
    config.translation.poll_interval_ms = 50;
    let controller = Controller::new(layout.clone(), config).with_translator(Arc::new(MockTranslator::failing()));

    let first = controller.start_translation(false).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = controller.start_translation(false).await;

    let first_outcome = Controller::follow(first, false).await.expect("finished");
    assert_eq!(first_outcome.state, FinishState::Cancelled);
    controller.stop(JobKind::Translate);
    let second_outcome = Controller::follow(second, false).await.expect("finished");
    assert_eq!(second_outcome.state, FinishState::Cancelled);
    Ok(())
}

/// Test that progress events are strictly increasing and Finished comes last
#[tokio::test]
async fn test_events_withMultiUnitJob_shouldBeMonotonicAndEndWithFinished() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "a"), ("page_2.txt", "b"), ("page_3.txt", "c")])?;
    let controller = common::mock_controller(&layout, &MockTranslator::working(), &MockTokenCounter::new());

    let mut events = controller.start_translation(false).await;
    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }

    let done: Vec<usize> = received
        .iter()
        .filter_map(|event| match event {
            JobEvent::Progress { done, .. } => Some(*done),
            _ => None,
        })
        .collect();
    assert_eq!(done, vec![1, 2, 3]);
    assert!(matches!(received.last(), Some(JobEvent::Finished { kind: JobKind::Translate, .. })));
    assert_eq!(
        received.iter().filter(|event| matches!(event, JobEvent::Finished { .. })).count(),
        1
    );
    Ok(())
}

/// Test that the token sweep without a counter fails through the error signal
#[tokio::test]
async fn test_token_sweep_withoutCounter_shouldFailWithConfigurationError() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "a")])?;
    let controller = Controller::new(layout, Config::default());

    let outcome = Controller::follow(controller.start_token_sweep().await, false).await.expect("finished");

    assert_eq!(outcome.state, FinishState::Failed);
    assert!(outcome.error.is_some_and(|message| message.contains("Configuration error")));
    Ok(())
}

/// Test the download job through the controller with a scripted scraper
#[tokio::test]
async fn test_download_withScraper_shouldWriteRawPages() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let layout = ProjectLayout::new(temp_dir.path());
    let scraper = MockScraper::new()
        .with_page("https://novel.test/1", "first", Some("https://novel.test/2"))
        .with_page("https://novel.test/2", "second", None);
    let controller = Controller::new(layout.clone(), common::fast_config()).with_scraper(Arc::new(scraper));

    let outcome = Controller::follow(controller.start_download("https://novel.test/1").await, false)
        .await
        .expect("finished");

    assert_eq!(outcome.state, FinishState::Completed);
    assert_eq!(common::read(&layout.raw_path("page_0002.txt")), "second");
    assert_eq!(controller.reconcile().len(), 2);
    Ok(())
}
