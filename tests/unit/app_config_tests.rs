/*!
 * Tests for application configuration
 */

use anyhow::Result;
use std::time::Duration;
use novelforge::app_config::{Config, LogLevel};
use crate::common;

/// Test that a missing config file is created with defaults
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.translation.model, "gemini-2.5-flash");
    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.text_rules.chapter_word, config.text_rules.chapter_word);
    Ok(())
}

/// Test that an invalid JSON config reports an error
#[test]
fn test_load_or_create_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ nope")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

/// Test that a saved config keeps custom values
#[test]
fn test_save_withCustomValues_shouldRoundTripThroughFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");
    let mut config = Config::default();
    config.text_rules.chapter_word = "Bölüm".to_string();
    config.translation.file_limit = Some(20);
    config.log_level = LogLevel::Debug;
    config.save(&path)?;

    let loaded = Config::load_or_create(&path)?;

    assert_eq!(loaded.text_rules.chapter_word, "Bölüm");
    assert_eq!(loaded.translation.file_limit, Some(20));
    assert_eq!(loaded.log_level, LogLevel::Debug);
    Ok(())
}

/// Test validation of values the jobs rely on
#[test]
fn test_validate_withInvalidValues_shouldFail() {
    let mut config = Config::default();
    config.translation.max_attempts = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.poll_interval_ms = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.text_rules.chapter_word = " ".to_string();
    assert!(config.validate().is_err());
}

/// Test the default retry policy: three attempts waiting 2s then 4s in 0.5s slices
#[test]
fn test_retry_policy_withDefaults_shouldMatchBackoffSchedule() {
    let policy = Config::default().translation.retry_policy();

    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
    assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
    assert_eq!(policy.poll_interval, Duration::from_millis(500));
}
