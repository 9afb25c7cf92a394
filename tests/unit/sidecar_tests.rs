/*!
 * Tests for the ledger and token cache sidecar files
 */

use anyhow::Result;
use novelforge::ledger::ErrorLedger;
use novelforge::project::ProjectLayout;
use novelforge::token_cache::{MetricCache, StageTag, TokenCount};
use crate::common;

/// Test that the ledger is stored as a flat JSON object
#[test]
fn test_ledger_save_withEntries_shouldWriteFlatObject() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[])?;
    let mut ledger = ErrorLedger::load(layout.translation_ledger_path());
    ledger.record("page_1.txt", "Translation error: quota");
    ledger.save()?;

    let value: serde_json::Value = serde_json::from_str(&common::read(&layout.translation_ledger_path()))?;

    assert_eq!(value, serde_json::json!({ "page_1.txt": "Translation error: quota" }));
    Ok(())
}

/// Test that a token cache written by an older run is read field by field
#[test]
fn test_token_cache_load_withExistingStore_shouldExposeCounts() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[])?;
    let store = serde_json::json!({
        "file_token_data": {
            "page_1.txt": { "original_tokens": 12, "original_mtime": 1700000000.25 },
            "translated_page_1.txt": { "translated_tokens": null, "translated_mtime": null }
        },
        "total_original_tokens": 12,
        "total_translated_tokens": 0,
        "total_combined_tokens": 12
    });
    std::fs::write(layout.token_cache_path(), store.to_string())?;

    let cache = MetricCache::load(layout.token_cache_path());

    assert_eq!(cache.count_for("page_1.txt", StageTag::Original), TokenCount::Counted(12));
    assert_eq!(cache.lookup("page_1.txt", StageTag::Original, 1700000000.25), Some(12));
    assert_eq!(cache.count_for("translated_page_1.txt", StageTag::Translated), TokenCount::Unavailable);
    assert_eq!(cache.count_for("page_2.txt", StageTag::Original), TokenCount::NotComputed);
    Ok(())
}

/// Test that every sidecar lives in the archive directory
#[test]
fn test_layout_sidecars_withAnyRoot_shouldLiveInArchive() {
    let layout = ProjectLayout::new("/projects/novel");
    for path in [
        layout.translation_ledger_path(),
        layout.cleaning_ledger_path(),
        layout.chapter_check_ledger_path(),
        layout.token_cache_path(),
    ] {
        assert_eq!(path.parent(), Some(layout.archive_dir().as_path()));
    }
    assert_eq!(layout.chapter_check_dir(), layout.archive_dir().join("chapter_check"));
}
