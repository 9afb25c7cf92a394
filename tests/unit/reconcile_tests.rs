/*!
 * Tests for stage reconciliation over a project on disk
 */

use anyhow::Result;
use novelforge::ledger::ErrorLedger;
use novelforge::reconcile::{ContentUnit, UnitStatus, reconcile};
use crate::common;

fn find<'a>(units: &'a [ContentUnit], key: &str) -> &'a ContentUnit {
    units
        .iter()
        .find(|unit| unit.key == key)
        .unwrap_or_else(|| panic!("no unit {}", key))
}

/// Test ordering of page_2 before page_10 across stages
#[test]
fn test_reconcile_withNumberedPages_shouldSortNaturally() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_10.txt", "x"), ("page_2.txt", "y")])?;
    common::create_test_file(&layout.translated_dir(), "translated_page_1.txt", "orphan")?;

    let keys: Vec<String> = reconcile(&layout).into_iter().map(|unit| unit.key).collect();

    assert_eq!(keys, vec!["page_1", "page_2", "page_10"]);
    Ok(())
}

/// Test that the translation ledger outranks the cleaning ledger as persisted on disk
#[test]
fn test_reconcile_withBothLedgerErrors_shouldReportTranslationError() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "Hello")])?;
    common::create_test_file(&layout.translated_dir(), "translated_page_1.txt", "placeholder")?;
    let mut translation = ErrorLedger::load(layout.translation_ledger_path());
    translation.record("page_1.txt", "Translation error: blocked");
    translation.save()?;
    let mut cleaning = ErrorLedger::load(layout.cleaning_ledger_path());
    cleaning.record("translated_page_1.txt", "Chapter marker not found; file left unchanged");
    cleaning.save()?;

    let units = reconcile(&layout);

    assert_eq!(
        find(&units, "page_1").status,
        UnitStatus::TranslationFailed("Translation error: blocked".to_string())
    );
    Ok(())
}

/// Test that a placeholder translation without a ledger entry counts as translated
#[test]
fn test_reconcile_withPlaceholderAndNoLedger_shouldBeTranslated() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "Hello")])?;
    common::create_test_file(
        &layout.translated_dir(),
        "translated_page_1.txt",
        "Translation error: boom\n\nOriginal text:\nHello...",
    )?;

    let units = reconcile(&layout);

    assert_eq!(find(&units, "page_1").status, UnitStatus::Translated);
    Ok(())
}

/// Test that a translation whose raw file was deleted is flagged with its last error
#[test]
fn test_reconcile_withDeletedOriginal_shouldReportMissingOriginal() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[])?;
    common::create_test_file(&layout.translated_dir(), "translated_page_4.txt", "text")?;
    let mut cleaning = ErrorLedger::load(layout.cleaning_ledger_path());
    cleaning.record("translated_page_4.txt", "disk full");
    cleaning.save()?;

    let units = reconcile(&layout);

    let unit = find(&units, "page_4");
    assert_eq!(unit.original_display(), "missing");
    assert_eq!(unit.status, UnitStatus::MissingOriginal { error: Some("disk full".to_string()) });
    assert_eq!(unit.status.label(), "missing original, error: disk full");
    Ok(())
}

/// Test that merge outputs become separate units and sidecars are ignored
#[test]
fn test_reconcile_withArchiveFiles_shouldListOnlyMergeOutputs() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "Hello")])?;
    common::create_test_file(&layout.archive_dir(), "merged_translation_20240101_101010.txt", "all")?;
    common::create_test_file(&layout.archive_dir(), "notes.txt", "not a merge")?;
    ErrorLedger::load(layout.cleaning_ledger_path()).save()?;

    let units = reconcile(&layout);

    assert_eq!(units.len(), 2);
    let archived = find(&units, "archive/merged_translation_20240101_101010");
    assert_eq!(archived.status, UnitStatus::Archived);
    assert_eq!(archived.output_display(), "merged_translation_20240101_101010.txt");
    Ok(())
}

/// Test that an empty raw file is still a unit
#[test]
fn test_reconcile_withEmptyRawFile_shouldKeepUnit() -> Result<()> {
    let (_temp_dir, layout) = common::create_project(&[("page_1.txt", "")])?;

    let units = reconcile(&layout);

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].status, UnitStatus::Downloaded);
    assert_eq!(units[0].stamp.size_display(), "0 B");
    Ok(())
}
